use std::collections::HashSet;
use std::fmt;

use chrono::NaiveTime;
use thiserror::Error;
use tracing::debug;

use crate::models::{hh_mm, DayOfWeek, ScheduleEntry};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("No schedule entry at position {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid time '{0}', expected HH:MM")]
    InvalidTime(String),
}

/// A single-field edit applied by `ScheduleEditor::update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleField {
    Day(DayOfWeek),
    Start(NaiveTime),
    End(NaiveTime),
    Active(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeBound {
    Start,
    End,
}

pub fn default_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn default_end() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Positions that share (day, start, end) with at least one other entry.
pub fn find_duplicates(entries: &[ScheduleEntry]) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(index, entry)| {
            entries
                .iter()
                .enumerate()
                .any(|(other, candidate)| other != *index && candidate.slot_key() == entry.slot_key())
        })
        .map(|(index, _)| index)
        .collect()
}

/// First weekday (Monday -> Sunday) with no entry; Monday once all are taken.
pub fn next_available_day(entries: &[ScheduleEntry]) -> DayOfWeek {
    let used: HashSet<DayOfWeek> = entries.iter().map(|entry| entry.dia_semana).collect();

    DayOfWeek::ALL
        .iter()
        .copied()
        .find(|day| !used.contains(day))
        .unwrap_or(DayOfWeek::Monday)
}

/// Keeps the first occurrence of every (day, start, end), preserving order.
pub fn deduplicate(entries: &[ScheduleEntry]) -> Vec<ScheduleEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| seen.insert(entry.slot_key()))
        .copied()
        .collect()
}

/// Monday-Friday, 09:00-18:00, all active.
pub fn workweek_template() -> Vec<ScheduleEntry> {
    DayOfWeek::WORKWEEK
        .iter()
        .map(|day| ScheduleEntry::new(*day, default_start(), default_end()))
        .collect()
}

type ChangeListener = Box<dyn FnMut(&[ScheduleEntry]) + Send>;

/// Ordered, in-memory list of schedule entries. Every mutation is pushed to
/// the change listener right away; nothing is persisted here.
///
/// Start/end ordering is not checked and duplicates are allowed to exist;
/// `duplicates()` only reports them.
pub struct ScheduleEditor {
    entries: Vec<ScheduleEntry>,
    on_change: Option<ChangeListener>,
}

impl ScheduleEditor {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            on_change: None,
        }
    }

    pub fn from_entries(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries,
            on_change: None,
        }
    }

    pub fn on_change<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&[ScheduleEntry]) + Send + 'static,
    {
        self.on_change = Some(Box::new(listener));
        self
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ScheduleEntry> {
        self.entries
    }

    /// Appends a 09:00-18:00 entry on the first unused weekday.
    pub fn add(&mut self) -> &ScheduleEntry {
        let day = next_available_day(&self.entries);
        debug!("Adding schedule entry for {}", day);

        self.entries
            .push(ScheduleEntry::new(day, default_start(), default_end()));
        self.notify();

        let last = self.entries.len() - 1;
        &self.entries[last]
    }

    pub fn remove(&mut self, index: usize) -> Result<ScheduleEntry, ScheduleError> {
        self.check_index(index)?;
        let removed = self.entries.remove(index);
        self.notify();
        Ok(removed)
    }

    pub fn update(&mut self, index: usize, field: ScheduleField) -> Result<(), ScheduleError> {
        self.check_index(index)?;

        let entry = &mut self.entries[index];
        match field {
            ScheduleField::Day(day) => entry.dia_semana = day,
            ScheduleField::Start(time) => entry.hora_inicio = hh_mm::truncate(time),
            ScheduleField::End(time) => entry.hora_fin = hh_mm::truncate(time),
            ScheduleField::Active(active) => entry.activo = active,
        }

        self.notify();
        Ok(())
    }

    /// Parses raw "HH:MM" form input and applies it to one bound.
    pub fn set_time_from_str(
        &mut self,
        index: usize,
        bound: TimeBound,
        raw: &str,
    ) -> Result<(), ScheduleError> {
        let time = hh_mm::parse(raw.trim()).map_err(|_| ScheduleError::InvalidTime(raw.to_string()))?;
        let field = match bound {
            TimeBound::Start => ScheduleField::Start(time),
            TimeBound::End => ScheduleField::End(time),
        };
        self.update(index, field)
    }

    pub fn quick_fill(&mut self) {
        self.entries = workweek_template();
        self.notify();
    }

    /// Returns how many entries were dropped.
    pub fn deduplicate(&mut self) -> usize {
        let before = self.entries.len();
        self.entries = deduplicate(&self.entries);
        let removed = before - self.entries.len();

        if removed > 0 {
            debug!("Removed {} duplicate schedule entries", removed);
        }
        self.notify();
        removed
    }

    pub fn duplicates(&self) -> Vec<usize> {
        find_duplicates(&self.entries)
    }

    pub fn has_duplicates(&self) -> bool {
        !self.duplicates().is_empty()
    }

    fn check_index(&self, index: usize) -> Result<(), ScheduleError> {
        if index >= self.entries.len() {
            return Err(ScheduleError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(())
    }

    fn notify(&mut self) {
        if let Some(listener) = self.on_change.as_mut() {
            listener(&self.entries);
        }
    }
}

impl Default for ScheduleEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ScheduleEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleEditor")
            .field("entries", &self.entries)
            .field("has_listener", &self.on_change.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use assert_matches::assert_matches;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn entry(day: DayOfWeek, start: (u32, u32), end: (u32, u32)) -> ScheduleEntry {
        ScheduleEntry::new(day, time(start.0, start.1), time(end.0, end.1))
    }

    #[test]
    fn test_duplicates_are_reported_symmetrically() {
        let entries = vec![
            entry(DayOfWeek::Monday, (9, 0), (18, 0)),
            entry(DayOfWeek::Tuesday, (9, 0), (18, 0)),
            entry(DayOfWeek::Monday, (9, 0), (18, 0)),
        ];
        assert_eq!(find_duplicates(&entries), vec![0, 2]);
    }

    #[test]
    fn test_active_flag_does_not_affect_duplicates() {
        let mut inactive = entry(DayOfWeek::Friday, (8, 0), (12, 0));
        inactive.activo = false;
        let entries = vec![entry(DayOfWeek::Friday, (8, 0), (12, 0)), inactive];
        assert_eq!(find_duplicates(&entries), vec![0, 1]);
    }

    #[test]
    fn test_same_day_different_times_are_not_duplicates() {
        let entries = vec![
            entry(DayOfWeek::Monday, (9, 0), (13, 0)),
            entry(DayOfWeek::Monday, (15, 0), (19, 0)),
        ];
        assert!(find_duplicates(&entries).is_empty());
        assert!(find_duplicates(&[]).is_empty());
    }

    #[test]
    fn test_next_day_skips_used_days() {
        let entries = vec![
            entry(DayOfWeek::Monday, (9, 0), (18, 0)),
            entry(DayOfWeek::Tuesday, (9, 0), (18, 0)),
        ];
        assert_eq!(next_available_day(&entries), DayOfWeek::Wednesday);
        assert_eq!(next_available_day(&[]), DayOfWeek::Monday);
    }

    #[test]
    fn test_next_day_fills_gaps_in_order() {
        let entries = vec![
            entry(DayOfWeek::Tuesday, (9, 0), (18, 0)),
            entry(DayOfWeek::Sunday, (9, 0), (18, 0)),
        ];
        assert_eq!(next_available_day(&entries), DayOfWeek::Monday);
    }

    #[test]
    fn test_next_day_wraps_to_monday_when_week_is_full() {
        let entries: Vec<_> = DayOfWeek::ALL
            .iter()
            .map(|day| entry(*day, (9, 0), (18, 0)))
            .collect();
        assert_eq!(next_available_day(&entries), DayOfWeek::Monday);
    }

    #[test]
    fn test_deduplicate_is_idempotent_and_keeps_first() {
        let mut first = entry(DayOfWeek::Monday, (9, 0), (18, 0));
        first.activo = false;
        let entries = vec![
            first,
            entry(DayOfWeek::Tuesday, (9, 0), (18, 0)),
            entry(DayOfWeek::Monday, (9, 0), (18, 0)),
        ];

        let once = deduplicate(&entries);
        let twice = deduplicate(&once);

        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
        assert!(!once[0].activo);
        assert_eq!(once[1].dia_semana, DayOfWeek::Tuesday);
    }

    #[test]
    fn test_add_uses_defaults() {
        let mut editor = ScheduleEditor::new();
        let added = *editor.add();

        assert_eq!(added.dia_semana, DayOfWeek::Monday);
        assert_eq!(added.hora_inicio, time(9, 0));
        assert_eq!(added.hora_fin, time(18, 0));
        assert!(added.activo);
    }

    #[test]
    fn test_update_and_remove() {
        let mut editor = ScheduleEditor::from_entries(workweek_template());

        editor.update(0, ScheduleField::Active(false)).unwrap();
        editor.update(1, ScheduleField::End(time(14, 30))).unwrap();
        editor.update(2, ScheduleField::Day(DayOfWeek::Sunday)).unwrap();

        assert!(!editor.entries()[0].activo);
        assert_eq!(editor.entries()[1].hora_fin, time(14, 30));
        assert_eq!(editor.entries()[2].dia_semana, DayOfWeek::Sunday);

        let removed = editor.remove(0).unwrap();
        assert_eq!(removed.dia_semana, DayOfWeek::Monday);
        assert_eq!(editor.len(), 4);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut editor = ScheduleEditor::new();
        assert_matches!(
            editor.remove(0),
            Err(ScheduleError::IndexOutOfRange { index: 0, len: 0 })
        );
        assert_matches!(
            editor.update(3, ScheduleField::Active(true)),
            Err(ScheduleError::IndexOutOfRange { index: 3, .. })
        );
    }

    #[test]
    fn test_start_after_end_is_accepted() {
        let mut editor = ScheduleEditor::new();
        editor.add();
        editor.update(0, ScheduleField::Start(time(20, 0))).unwrap();
        assert!(editor.entries()[0].hora_inicio > editor.entries()[0].hora_fin);
    }

    #[test]
    fn test_set_time_from_str() {
        let mut editor = ScheduleEditor::new();
        editor.add();

        editor.set_time_from_str(0, TimeBound::Start, "07:45").unwrap();
        assert_eq!(editor.entries()[0].hora_inicio, time(7, 45));

        assert_matches!(
            editor.set_time_from_str(0, TimeBound::End, "25:00"),
            Err(ScheduleError::InvalidTime(raw)) if raw == "25:00"
        );
    }

    #[test]
    fn test_seconds_are_dropped_from_input() {
        let mut editor = ScheduleEditor::new();
        editor.add();
        editor.add();
        editor.update(1, ScheduleField::Day(DayOfWeek::Monday)).unwrap();

        editor.set_time_from_str(0, TimeBound::Start, "09:00:30").unwrap();
        assert_eq!(editor.entries()[0].hora_inicio, time(9, 0));

        editor
            .update(1, ScheduleField::End(NaiveTime::from_hms_opt(18, 0, 45).unwrap()))
            .unwrap();
        assert_eq!(editor.entries()[1].hora_fin, time(18, 0));
        assert_eq!(editor.duplicates(), vec![0, 1]);
    }

    #[test]
    fn test_entries_differing_only_in_seconds_are_duplicates() {
        let mut with_seconds = entry(DayOfWeek::Tuesday, (9, 0), (18, 0));
        with_seconds.hora_inicio = NaiveTime::from_hms_opt(9, 0, 59).unwrap();
        let entries = vec![entry(DayOfWeek::Tuesday, (9, 0), (18, 0)), with_seconds];

        assert_eq!(find_duplicates(&entries), vec![0, 1]);
        assert_eq!(deduplicate(&entries).len(), 1);
    }

    #[test]
    fn test_listener_receives_every_change() {
        let snapshots: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = snapshots.clone();

        let mut editor = ScheduleEditor::new().on_change(move |entries| {
            sink.lock().unwrap().push(entries.len());
        });

        editor.quick_fill();
        editor.add();
        editor.remove(0).unwrap();
        editor.deduplicate();

        assert_eq!(*snapshots.lock().unwrap(), vec![5, 6, 5, 5]);
    }

    #[test]
    fn test_schedule_workflow() {
        let mut editor = ScheduleEditor::new();

        editor.quick_fill();
        assert_eq!(editor.len(), 5);
        assert!(editor
            .entries()
            .iter()
            .zip(DayOfWeek::WORKWEEK.iter())
            .all(|(entry, day)| entry.dia_semana == *day
                && entry.hora_inicio == time(9, 0)
                && entry.hora_fin == time(18, 0)
                && entry.activo));
        assert!(editor.duplicates().is_empty());

        let added = *editor.add();
        assert_eq!(added.dia_semana, DayOfWeek::Saturday);

        // A second entry lands on Sunday; move it onto Saturday.
        assert_eq!(editor.add().dia_semana, DayOfWeek::Sunday);
        editor.update(6, ScheduleField::Day(DayOfWeek::Saturday)).unwrap();
        assert_eq!(editor.duplicates(), vec![5, 6]);

        assert_eq!(editor.deduplicate(), 1);
        assert_eq!(editor.len(), 6);
        assert!(!editor.has_duplicates());
    }
}
