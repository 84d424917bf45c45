//! The line model of an iCal file: an ordered list of property records

/// One (logical) line of an iCal file.
///
/// Records that have never been modified are serialized back exactly as they were read,
/// including their line folding.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRecord {
    key: String,
    parameters: String,
    value: String,
    /// Name of the innermost block (`VTODO`, `VALARM`...) this line is in.
    /// `BEGIN` and `END` lines belong to the block that encloses the one they open or close.
    component: Option<String>,
    depth: usize,

    /// Instance number of the block this line is in
    block: Option<usize>,
    /// For `BEGIN` and `END` lines: instance number of the block they open or close
    delimits: Option<usize>,

    /// The physical line(s) this record has been parsed from, joined by CRLF
    original: String,
    /// The logical (unfolded) line
    unfolded: String,
    /// The value, as it was when parsed. `None` for records that have been added
    original_value: Option<String>,

    modified: bool,
    marked_for_addition: bool,
    marked_for_deletion: bool,
}

impl PropertyRecord {
    pub(crate) fn parsed(line: &str, component: Option<String>, depth: usize, block: Option<usize>) -> Self {
        let mut record = Self {
            key: String::new(),
            parameters: String::new(),
            value: String::new(),
            component,
            depth,
            block,
            delimits: None,
            original: line.to_string(),
            unfolded: line.to_string(),
            original_value: None,
            modified: false,
            marked_for_addition: false,
            marked_for_deletion: false,
        };
        record.split_unfolded();
        record
    }

    fn added(key: &str, value: &str, component: &str, depth: usize, block: Option<usize>) -> Self {
        Self {
            key: key.to_string(),
            parameters: String::new(),
            value: value.to_string(),
            component: Some(component.to_string()),
            depth,
            block,
            delimits: None,
            original: String::new(),
            unfolded: String::new(),
            original_value: None,
            modified: true,
            marked_for_addition: true,
            marked_for_deletion: false,
        }
    }

    /// Append a folded continuation line (including its leading whitespace)
    pub(crate) fn append_continuation(&mut self, physical_line: &str) {
        self.original.push_str("\r\n");
        self.original.push_str(physical_line);
        self.unfolded.push_str(&physical_line[1..]);
        self.split_unfolded();
    }

    pub(crate) fn set_delimits(&mut self, block: usize) {
        self.delimits = Some(block);
    }

    /// Splits the unfolded line into `key;parameters:value`
    fn split_unfolded(&mut self) {
        let (key_part, value) = match find_unquoted(&self.unfolded, ':') {
            Some(pos) => (&self.unfolded[..pos], &self.unfolded[pos + 1..]),
            None => (self.unfolded.as_str(), ""),
        };
        let (key, parameters) = match key_part.split_once(';') {
            Some((key, parameters)) => (key, parameters),
            None => (key_part, ""),
        };
        self.key = key.to_string();
        self.parameters = parameters.to_string();
        self.value = value.to_string();
        self.original_value = Some(value.to_string());
    }

    pub fn key(&self) -> &str              { &self.key }
    pub fn parameters(&self) -> &str       { &self.parameters }
    pub fn value(&self) -> &str            { &self.value }
    pub fn component(&self) -> Option<&str> { self.component.as_deref() }
    pub fn depth(&self) -> usize           { self.depth }
    pub fn original(&self) -> &str         { &self.original }
    /// The unfolded line, as read from the source
    pub fn original_line(&self) -> &str    { &self.unfolded }
    pub fn original_value(&self) -> Option<&str> { self.original_value.as_deref() }
    pub fn is_modified(&self) -> bool      { self.modified }
    pub fn is_marked_for_addition(&self) -> bool { self.marked_for_addition }
    pub fn is_marked_for_deletion(&self) -> bool { self.marked_for_deletion }

    fn belongs_to(&self, block: usize) -> bool {
        self.block == Some(block) && self.marked_for_deletion == false
    }
}

/// Position of the first `separator` that is not inside a double-quoted parameter value
fn find_unquoted(line: &str, separator: char) -> Option<usize> {
    let mut quoted = false;
    for (pos, c) in line.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && quoted == false {
            return Some(pos);
        }
    }
    None
}


/// A parsed iCal file.
///
/// Components are addressed by name (e.g. `VTODO`). When a file contains several blocks with the same name
/// (e.g. several `VALARM`s), only the first one is ever looked up or modified.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ParsedDocument {
    records: Vec<PropertyRecord>,
}

impl ParsedDocument {
    pub(crate) fn from_records(records: Vec<PropertyRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Instance number of the first block named `component`
    fn first_block(&self, component: &str) -> Option<usize> {
        self.records.iter()
            .find(|r| r.key == "BEGIN" && r.value == component && r.delimits.is_some())
            .and_then(|r| r.delimits)
    }

    fn position(&self, component: &str, key: &str) -> Option<usize> {
        let block = self.first_block(component)?;
        self.records.iter().position(|r| r.belongs_to(block) && r.key == key)
    }

    /// Index of the `END` line that closes `block`
    fn end_position(&self, block: usize) -> Option<usize> {
        self.records.iter().position(|r| r.key == "END" && r.delimits == Some(block))
    }

    /// The first record with this `key` in (the first block of) `component`
    pub fn find_property(&self, component: &str, key: &str) -> Option<&PropertyRecord> {
        self.position(component, key).map(|i| &self.records[i])
    }

    /// Shortcut to get the value of [`Self::find_property`]
    pub fn value_of(&self, component: &str, key: &str) -> Option<&str> {
        self.find_property(component, key).map(|r| r.value())
    }

    /// Tells whether (the first block of) `component` exists in this document
    pub fn has_component(&self, component: &str) -> bool {
        self.first_block(component).is_some()
    }

    /// Set the value of a property.
    ///
    /// If the property exists, its value is replaced (its parameters are kept).
    /// Otherwise, a new record is inserted just before the first `insert_before` line of the component.
    /// `insert_before` defaults to (and falls back to) the `END` line of the component.
    pub fn set_property(&mut self, component: &str, key: &str, value: &str, insert_before: Option<&str>) {
        if let Some(i) = self.position(component, key) {
            let existing = &mut self.records[i];
            existing.value = value.to_string();
            existing.modified = true;
            log::debug!("set property:   {} to {}", key, value);
            return;
        }

        let block = self.first_block(component);
        let anchor = insert_before.unwrap_or("END");
        let position = block.and_then(|b| {
            let anchor_position = match anchor {
                "END" => None,
                anchor => self.records.iter().position(|r| r.belongs_to(b) && r.key == anchor),
            };
            if anchor_position.is_none() && anchor != "END" {
                log::debug!("No {} in {}, adding {} at the end of it", anchor, component, key);
            }
            anchor_position.or_else(|| self.end_position(b))
        });

        let depth = match position {
            Some(p) => match self.records[p].key.as_str() {
                "END" => self.records[p].depth + 1,
                _ => self.records[p].depth,
            },
            None => 0,
        };
        let new_record = PropertyRecord::added(key, value, component, depth, block);

        match position {
            Some(p) => {
                log::debug!("add property:   {} value: {} at position: {}", key, value, p);
                self.records.insert(p, new_record);
            },
            None => {
                log::warn!("No {} block found, appending {} at the end of the file", component, key);
                self.records.push(new_record);
            },
        }
    }

    /// Mark every `key` property of (the first block of) `component` for deletion.
    ///
    /// Returns the number of records that have been marked. They are actually removed when serializing.
    pub fn delete_property(&mut self, component: &str, key: &str) -> usize {
        let block = match self.first_block(component) {
            None => return 0,
            Some(b) => b,
        };

        let mut n_deleted = 0;
        for record in self.records.iter_mut().filter(|r| r.belongs_to(block) && r.key == key) {
            record.marked_for_deletion = true;
            n_deleted += 1;
        }
        if n_deleted == 0 {
            log::debug!("cannot delete non-existing property: {}", key);
        } else {
            log::debug!("del property:   {} ({} line(s))", key, n_deleted);
        }
        n_deleted
    }
}
