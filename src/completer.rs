//! Completing to-do items (iCal `VTODO`s)
//!
//! Completing a task that has no `RRULE` just marks it as completed.
//!
//! Completing a recurring task moves it to its next occurrence instead (this is what CalDAV clients expect, since the
//! `DTSTART` and `DUE` of a recurring task tell its next pending occurrence). A completed copy of the occurrence that
//! has just been done is written to a new item, so that the history is kept. \
//! When the recurrence is over, the task is completed as if it had never been recurring.
//!
//! Every completion works on its own copy of the item, fetched just before being modified. Completing the same task twice
//! concurrently is a race (the last write wins), that callers must avoid.

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::error::{CompletionError, ConfigError};
use crate::ical::{format_ics_date, is_ics_date, parse, parse_ics_date, serialize, ParsedDocument};
use crate::item::{generate_uid, ItemId};
use crate::recurrence::{Candidates, Recurrence};
use crate::traits::TaskStore;

const VTODO: &str = "VTODO";
const VALARM: &str = "VALARM";


/// What completing a task will do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecurrenceDecision {
    /// The task is not recurring, it is marked as completed
    Terminal,
    /// The task is moved to its next occurrence
    AdvanceInPlace,
    /// The task is moved to its next occurrence, and a completed copy of the current occurrence is created
    AdvanceWithCompletedCopy,
}

/// An iCal file that must be written
#[derive(Clone, Debug, PartialEq)]
pub struct WrittenItem {
    pub id: ItemId,
    pub content: String,
}

/// The result of a completion
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    /// The item that has been completed (or moved to its next occurrence). Its identifier never changes
    pub completed: WrittenItem,
    /// The completed copy of an occurrence of a recurring task, if one has been created
    pub created: Option<WrittenItem>,
}

impl Completion {
    fn in_place(id: &ItemId, doc: &ParsedDocument) -> Self {
        Self {
            completed: WrittenItem { id: id.clone(), content: serialize(doc) },
            created: None,
        }
    }

    pub fn completed_id(&self) -> &ItemId {
        &self.completed.id
    }

    pub fn created_id(&self) -> Option<&ItemId> {
        self.created.as_ref().map(|item| &item.id)
    }
}


/// Tells whether the `VTODO` has an `RRULE`
pub fn is_recurring(doc: &ParsedDocument) -> bool {
    doc.find_property(VTODO, "RRULE").is_some()
}

/// Tells whether the `VTODO` has a `COMPLETED` status
pub fn is_completed(doc: &ParsedDocument) -> bool {
    doc.value_of(VTODO, "STATUS") == Some("COMPLETED")
}

/// Mark the `VTODO` as completed at `completed_at`
pub fn complete_non_recurring(doc: &mut ParsedDocument, completed_at: &DateTime<Utc>, now: &DateTime<Utc>) {
    let now = format_ics_date(now);
    doc.set_property(VTODO, "COMPLETED", &format_ics_date(completed_at), Some("CREATED"));
    doc.set_property(VTODO, "DTSTAMP", &now, None);
    doc.set_property(VTODO, "LAST-MODIFIED", &now, None);
    doc.set_property(VTODO, "STATUS", "COMPLETED", None);
    doc.set_property(VTODO, "PERCENT-COMPLETE", "100", Some("STATUS"));
}

/// Mark the `VTODO` as not completed anymore
pub fn reopen(doc: &mut ParsedDocument, now: &DateTime<Utc>) {
    let now = format_ics_date(now);
    doc.delete_property(VTODO, "COMPLETED");
    doc.delete_property(VTODO, "PERCENT-COMPLETE");
    doc.set_property(VTODO, "DTSTAMP", &now, None);
    doc.set_property(VTODO, "LAST-MODIFIED", &now, None);
    doc.set_property(VTODO, "STATUS", "NEEDS-ACTION", None);
}

/// Move the `VTODO` (and its alarm, when it is set at an absolute time) to `next`
fn move_to_occurrence(doc: &mut ParsedDocument, next: &DateTime<Utc>, now: &DateTime<Utc>) {
    let next = format_ics_date(next);
    let now = format_ics_date(now);

    doc.set_property(VTODO, "DTSTART", &next, None);
    doc.set_property(VTODO, "DUE", &next, None);
    doc.set_property(VTODO, "DTSTAMP", &now, None);
    doc.set_property(VTODO, "LAST-MODIFIED", &now, None);

    let absolute_trigger = doc.find_property(VALARM, "TRIGGER")
        .map(|trigger| trigger.parameters().to_uppercase().contains("VALUE=DATE-TIME") || is_ics_date(trigger.value()))
        .unwrap_or(false);
    if absolute_trigger {
        // Otherwise, clients may consider this alarm has already been fired
        let alarm_uid = generate_uid();
        doc.set_property(VALARM, "TRIGGER", &next, None);
        doc.set_property(VALARM, "UID", &alarm_uid, None);
        doc.set_property(VALARM, "X-WR-ALARMUID", &alarm_uid, None);
    }
}


/// Completes tasks, using a given clock to know what "now" and "today" are
#[derive(Clone, Debug)]
pub struct Completer<C: Clock = SystemClock> {
    clock: C,
    keep_completed_copies: bool,
}

impl Completer<SystemClock> {
    /// A completer that uses the system time and time zone
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self::with_clock(settings.clock()?)
            .keep_completed_copies(settings.keep_completed_copies))
    }
}

impl Default for Completer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Completer<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock, keep_completed_copies: true }
    }

    /// Whether completing an occurrence of a recurring task should create a completed copy of it (this is the default)
    pub fn keep_completed_copies(mut self, keep: bool) -> Self {
        self.keep_completed_copies = keep;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Tells what completing this document would do (provided its recurrence is not over)
    pub fn decide(&self, doc: &ParsedDocument) -> RecurrenceDecision {
        match (is_recurring(doc), self.keep_completed_copies) {
            (false, _) => RecurrenceDecision::Terminal,
            (true, true) => RecurrenceDecision::AdvanceWithCompletedCopy,
            (true, false) => RecurrenceDecision::AdvanceInPlace,
        }
    }

    /// Complete the task contained in `content`, that is stored at `id`.
    ///
    /// `completed_at` defaults to now. Nothing is written: the returned [`Completion`] tells what must be.
    pub fn complete_text(&self, id: &ItemId, content: &str, completed_at: Option<DateTime<Utc>>) -> Result<Completion, CompletionError> {
        self.complete_document(id, parse(content), completed_at)
    }

    fn complete_document(&self, id: &ItemId, mut doc: ParsedDocument, completed_at: Option<DateTime<Utc>>) -> Result<Completion, CompletionError> {
        let now = self.clock.now();
        let completed_at = completed_at.unwrap_or(now);

        match self.decide(&doc) {
            RecurrenceDecision::Terminal => {
                log::info!("{} is not recurring", id);
                complete_non_recurring(&mut doc, &completed_at, &now);
                Ok(Completion::in_place(id, &doc))
            },
            decision => {
                log::info!("{} is recurring", id);
                self.advance_recurrence(id, doc, &completed_at, decision)
            },
        }
    }

    /// Move a recurring task to its next occurrence, and (depending on `decision`) create a completed copy of the current one.
    ///
    /// In case there is no next occurrence, the task is just marked as completed.
    pub fn advance_recurrence(&self, id: &ItemId, mut doc: ParsedDocument, completed_at: &DateTime<Utc>, decision: RecurrenceDecision)
        -> Result<Completion, CompletionError>
    {
        let now = self.clock.now();

        let rrule_line = doc.find_property(VTODO, "RRULE")
            .filter(|rrule| rrule.value().trim().is_empty() == false)
            .map(|rrule| rrule.original_line().to_string())
            .ok_or_else(|| CompletionError::missing(VTODO, "RRULE"))?;
        let dtstart = doc.value_of(VTODO, "DTSTART")
            .ok_or_else(|| CompletionError::missing(VTODO, "DTSTART"))
            .and_then(parse_ics_date)?;
        let due = doc.value_of(VTODO, "DUE")
            .map(parse_ics_date)
            .transpose()?;
        let original_uid = doc.value_of(VTODO, "UID").map(|uid| uid.to_string());

        let recurrence = Recurrence::new(&dtstart, &rrule_line)?;
        let candidates = Candidates::compute(&recurrence, due.as_ref(), &self.clock);
        log::debug!("Recurrence {:?}, due {:?}", recurrence.source(), due);
        log::debug!("Candidates: {:?}", candidates);

        let next = match candidates.choose(due.as_ref()) {
            None => {
                log::info!("No more occurrences for {}, completing it", id);
                complete_non_recurring(&mut doc, completed_at, &now);
                return Ok(Completion::in_place(id, &doc));
            },
            Some(next) => next,
        };
        log::info!("Moving {} to its next occurrence at {}", id, next);

        let mut completed_occurrence = match decision {
            RecurrenceDecision::AdvanceWithCompletedCopy => Some(doc.clone()),
            _ => None,
        };

        move_to_occurrence(&mut doc, &next, &now);
        let live = WrittenItem { id: id.clone(), content: serialize(&doc) };

        let created = completed_occurrence.as_mut().map(|copy| {
            let new_uid = generate_uid();
            complete_non_recurring(copy, completed_at, &now);
            copy.set_property(VTODO, "UID", &new_uid, None);
            // This copy is a one-off task
            copy.delete_property(VTODO, "RRULE");

            let new_id = id.derive_for_uid(original_uid.as_deref(), &new_uid);
            log::info!("Completed occurrence of {} will be stored at {}", id, new_id);
            WrittenItem { id: new_id, content: serialize(copy) }
        });

        Ok(Completion { completed: live, created })
    }

    /// Reopen the task contained in `content`
    pub fn reopen_text(&self, id: &ItemId, content: &str) -> Completion {
        let mut doc = parse(content);
        reopen(&mut doc, &self.clock.now());
        Completion::in_place(id, &doc)
    }

    /// Reopen the task contained in `content` in case it is completed, complete it otherwise
    pub fn toggle_text(&self, id: &ItemId, content: &str, completed_at: Option<DateTime<Utc>>) -> Result<Completion, CompletionError> {
        let doc = parse(content);
        match is_completed(&doc) {
            true => Ok(self.reopen_text(id, content)),
            false => self.complete_document(id, doc, completed_at),
        }
    }

    /// Fetch a task from `store`, complete it, and write the result(s) back.
    ///
    /// The task itself is written first, then its completed copy (if any).
    pub async fn complete_task<S>(&self, store: &mut S, id: &ItemId, completed_at: Option<DateTime<Utc>>) -> Result<Completion, CompletionError>
    where
        S: TaskStore + ?Sized,
    {
        log::info!("Completing VTODO {}", id);
        let content = fetch(&*store, id).await?;
        let completion = self.complete_text(id, &content, completed_at)?;
        persist(store, &completion).await?;
        Ok(completion)
    }

    /// Fetch a task from `store`, reopen it, and write it back
    pub async fn reopen_task<S>(&self, store: &mut S, id: &ItemId) -> Result<Completion, CompletionError>
    where
        S: TaskStore + ?Sized,
    {
        log::info!("Reopening VTODO {}", id);
        let content = fetch(&*store, id).await?;
        let completion = self.reopen_text(id, &content);
        persist(store, &completion).await?;
        Ok(completion)
    }

    /// Fetch a task from `store`, toggle its completion, and write the result(s) back
    pub async fn toggle_task<S>(&self, store: &mut S, id: &ItemId, completed_at: Option<DateTime<Utc>>) -> Result<Completion, CompletionError>
    where
        S: TaskStore + ?Sized,
    {
        log::info!("Toggling VTODO {}", id);
        let content = fetch(&*store, id).await?;
        let completion = self.toggle_text(id, &content, completed_at)?;
        persist(store, &completion).await?;
        Ok(completion)
    }
}

async fn fetch<S: TaskStore + ?Sized>(store: &S, id: &ItemId) -> Result<String, CompletionError> {
    store.fetch(id).await
        .map_err(|source| CompletionError::Fetch { id: id.clone(), source })
}

async fn persist<S: TaskStore + ?Sized>(store: &mut S, completion: &Completion) -> Result<(), CompletionError> {
    let live = &completion.completed;
    store.write(&live.id, live.content.clone()).await
        .map_err(|source| CompletionError::Write { id: live.id.clone(), source })?;

    if let Some(created) = &completion.created {
        if let Err(source) = store.write(&created.id, created.content.clone()).await {
            log::error!("{} has been moved to its next occurrence, but its completed copy could not be written to {}: {}", live.id, created.id, source);
            return Err(CompletionError::Write { id: created.id.clone(), source });
        }
    }
    Ok(())
}
