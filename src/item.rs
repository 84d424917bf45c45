//! Identifiers of CalDAV items, and of the iCal components they contain

use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;


/// The identifier of a CalDAV resource (usually its URL, or a path relative to a calendar collection).
///
/// This is opaque to the completion engine: it is only handed over to a [`TaskStore`](crate::traits::TaskStore),
/// and textually rewritten when a historical copy of a recurring task must be created.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemId {
    content: String,
}

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// The identifier of a new resource that holds the same task under `new_uid`.
    ///
    /// Every occurrence of `old_uid` is replaced by `new_uid`, so that `.../abc-123.ics` becomes `.../<new_uid>.ics`. \
    /// In case `old_uid` does not appear (or is unknown), the last path segment is replaced by `<new_uid>.ics`,
    /// so that the derived identifier can never be the same as this one.
    pub fn derive_for_uid(&self, old_uid: Option<&str>, new_uid: &str) -> ItemId {
        if let Some(old) = old_uid {
            if old.is_empty() == false && self.content.contains(old) {
                return ItemId::from(self.content.replace(old, new_uid));
            }
        }

        let new_segment = format!("{}.ics", new_uid);
        match self.content.rfind('/') {
            Some(pos) => ItemId::from(format!("{}{}", &self.content[..=pos], new_segment)),
            None => ItemId::from(new_segment),
        }
    }
}

impl From<String> for ItemId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for ItemId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}
impl From<Url> for ItemId {
    fn from(url: Url) -> Self {
        Self { content: url.to_string() }
    }
}
impl FromStr for ItemId {
    type Err = Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.content)
    }
}

/// Used to support serde
impl Serialize for ItemId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.content)
    }
}
/// Used to support serde
impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<ItemId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let content = String::deserialize(deserializer)?;
        Ok(ItemId{ content })
    }
}


/// Generate a new iCal `UID`.
///
/// This is an uppercase, hyphenated version-4 UUID (e.g. `1F3A1C2E-7B4D-4E0A-9C55-0D1E2F3A4B5C`),
/// since some CalDAV servers validate the shape of UIDs.
pub fn generate_uid() -> String {
    uuid::Uuid::new_v4().to_hyphenated().to_string().to_uppercase()
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_uid_shape() {
        for _ in 0..32 {
            let uid = generate_uid();
            assert_eq!(uid.len(), 36);

            let groups: Vec<&str> = uid.split('-').collect();
            let lengths: Vec<usize> = groups.iter().map(|g| g.len()).collect();
            assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
            assert!(uid.chars().all(|c| c == '-' || c.is_ascii_digit() || ('A'..='F').contains(&c)));

            assert!(groups[2].starts_with('4'));
            assert!(['8', '9', 'A', 'B'].iter().any(|v| groups[3].starts_with(*v)));
        }
    }

    #[test]
    fn test_derive_replaces_uid() {
        let id = ItemId::from("https://my.server/dav/calendars/me/tasks/abc-123.ics");
        let derived = id.derive_for_uid(Some("abc-123"), "NEW-UID");
        assert_eq!(derived.as_str(), "https://my.server/dav/calendars/me/tasks/NEW-UID.ics");
    }

    #[test]
    fn test_derive_without_uid_in_path() {
        let id = ItemId::from("https://my.server/dav/tasks/random-name.ics");
        let derived = id.derive_for_uid(Some("abc-123"), "NEW-UID");
        assert_eq!(derived.as_str(), "https://my.server/dav/tasks/NEW-UID.ics");

        let bare = ItemId::from("random-name.ics");
        assert_eq!(bare.derive_for_uid(None, "NEW-UID").as_str(), "NEW-UID.ics");

        let empty_uid = ItemId::from("tasks/x.ics");
        assert_eq!(empty_uid.derive_for_uid(Some(""), "N").as_str(), "tasks/N.ics");
    }

    #[test]
    fn test_serde() {
        let id = ItemId::from("tasks/abc.ics");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"tasks/abc.ics\"");
        let back: ItemId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
