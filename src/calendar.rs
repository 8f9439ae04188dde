//! Vue calendrier des entretiens : grille mensuelle et catégorie dominante par jour.
//!
//! Les entretiens sont rattachés à une case par égalité de clé jour (`YYYY-MM-DD`),
//! pas par intervalle d'horodatage. Seul le squelette de la grille est mémorisé ;
//! le contenu des cases est recalculé à chaque appel.

use crate::model::Interview;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

/// Horizon en deçà duquel un entretien est considéré urgent.
pub const URGENT_HORIZON_HOURS: i64 = 24;

/// Catégorie visuelle d'un jour, par priorité décroissante.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayCategory {
    Empty,
    Selection,
    Final,
    Urgent,
}

impl DayCategory {
    pub fn symbol(self) -> char {
        match self {
            DayCategory::Empty => ' ',
            DayCategory::Selection => 's',
            DayCategory::Final => 'F',
            DayCategory::Urgent => '!',
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

/// Catégorie dominante d'un ensemble d'entretiens du même jour.
///
/// Urgent si l'un commence dans `[now, now + 24h]`, sinon final si l'un est final,
/// sinon sélection.
pub fn categorize<'a, I>(day: I, now: DateTime<Utc>, offset: &FixedOffset) -> DayCategory
where
    I: IntoIterator<Item = &'a Interview>,
{
    let horizon = now + Duration::hours(URGENT_HORIZON_HOURS);
    day.into_iter()
        .map(|i| {
            let urgent = i
                .starts_at(offset)
                .is_some_and(|start| start >= now && start <= horizon);
            if urgent {
                DayCategory::Urgent
            } else if i.is_final() {
                DayCategory::Final
            } else {
                DayCategory::Selection
            }
        })
        .max()
        .unwrap_or(DayCategory::Empty)
}

/// Squelette d'un mois : semaines complètes commençant le lundi.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub days: Vec<NaiveDate>,
}

impl MonthGrid {
    pub fn build(year: i32, month: u32) -> Result<Self, CalendarError> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(CalendarError::InvalidMonth { year, month })?;
        let lead = i64::from(first.weekday().num_days_from_monday());
        let start = first - Duration::days(lead);

        let (ny, nm) = next_month(year, month);
        let next_first = NaiveDate::from_ymd_opt(ny, nm, 1)
            .ok_or(CalendarError::InvalidMonth { year: ny, month: nm })?;
        let last = next_first - Duration::days(1);
        let trail = 6 - i64::from(last.weekday().num_days_from_monday());
        let end = last + Duration::days(trail);

        let days = start
            .iter_days()
            .take_while(|d| *d <= end)
            .collect();
        Ok(Self { year, month, days })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn weeks(&self) -> impl Iterator<Item = &[NaiveDate]> {
        self.days.chunks(7)
    }
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Case calculée de la grille.
#[derive(Debug, Clone, Serialize)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    pub category: DayCategory,
    #[serde(skip)]
    pub interviews: Vec<&'a Interview>,
}

/// État de l'écran calendrier : mois affiché, date sélectionnée, grille mémorisée.
#[derive(Debug, Clone)]
pub struct CalendarView {
    grid: MonthGrid,
    selected: NaiveDate,
    offset: FixedOffset,
}

impl CalendarView {
    /// Ouvre la vue sur le mois de `selected`.
    pub fn new(selected: NaiveDate, offset: FixedOffset) -> Result<Self, CalendarError> {
        Ok(Self {
            grid: MonthGrid::build(selected.year(), selected.month())?,
            selected,
            offset,
        })
    }

    pub fn grid(&self) -> &MonthGrid {
        &self.grid
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn displayed_month(&self) -> (i32, u32) {
        (self.grid.year, self.grid.month)
    }

    /// Affiche un autre mois ; la grille n'est reconstruite que si le mois change.
    pub fn show_month(&mut self, year: i32, month: u32) -> Result<(), CalendarError> {
        if (year, month) != self.displayed_month() {
            self.grid = MonthGrid::build(year, month)?;
        }
        Ok(())
    }

    pub fn next_month(&mut self) -> Result<(), CalendarError> {
        let (y, m) = next_month(self.grid.year, self.grid.month);
        self.show_month(y, m)
    }

    pub fn previous_month(&mut self) -> Result<(), CalendarError> {
        let (y, m) = previous_month(self.grid.year, self.grid.month);
        self.show_month(y, m)
    }

    /// Sélectionne une date ; bascule sur son mois si besoin.
    pub fn select(&mut self, date: NaiveDate) -> Result<(), CalendarError> {
        self.selected = date;
        self.show_month(date.year(), date.month())
    }

    /// Calcule toutes les cases de la grille affichée.
    pub fn cells<'a>(&self, interviews: &'a [Interview], now: DateTime<Utc>) -> Vec<DayCell<'a>> {
        let today = now.with_timezone(&self.offset).date_naive();
        self.grid
            .days
            .iter()
            .map(|&date| {
                let key = date.format("%Y-%m-%d").to_string();
                let matching: Vec<&Interview> =
                    interviews.iter().filter(|i| i.day_key() == key).collect();
                DayCell {
                    date,
                    in_month: self.grid.contains(date),
                    is_today: date == today,
                    is_selected: date == self.selected,
                    category: categorize(matching.iter().copied(), now, &self.offset),
                    interviews: matching,
                }
            })
            .collect()
    }

    /// Entretiens du jour sélectionné, triés par heure.
    pub fn selected_interviews<'a>(&self, interviews: &'a [Interview]) -> Vec<&'a Interview> {
        let key = self.selected.format("%Y-%m-%d").to_string();
        let mut out: Vec<&Interview> = interviews.iter().filter(|i| i.day_key() == key).collect();
        out.sort_by_key(|i| i.time);
        out
    }

    /// Rendu texte compact du mois (une ligne par semaine).
    pub fn render_text(&self, interviews: &[Interview], now: DateTime<Utc>) -> String {
        let cells = self.cells(interviews, now);
        let mut out = String::from(" lu  ma  me  je  ve  sa  di\n");
        for week in cells.chunks(7) {
            let line: Vec<String> = week
                .iter()
                .map(|c| {
                    if !c.in_month {
                        return "  . ".to_string();
                    }
                    let mark = if c.is_selected { '>' } else { ' ' };
                    format!("{mark}{:>2}{}", c.date.day(), c.category.symbol())
                })
                .collect();
            out.push_str(line.join("").trim_end());
            out.push('\n');
        }
        out
    }
}

/// Entretiens à venir, triés par date de début.
pub fn upcoming<'a>(
    interviews: &'a [Interview],
    now: DateTime<Utc>,
    offset: &FixedOffset,
) -> Vec<&'a Interview> {
    let mut out: Vec<(DateTime<Utc>, &Interview)> = interviews
        .iter()
        .filter_map(|i| i.starts_at(offset).map(|s| (s, i)))
        .filter(|(start, _)| *start > now)
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
    out.into_iter().map(|(_, i)| i).collect()
}
