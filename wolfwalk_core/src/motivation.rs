//! Motivation layer: streaks, badges, stickers, XP and chapters.
//!
//! The session only ever calls [`Motivator::on_session_complete`] once per
//! finished routine and shows what comes back.

use crate::store::{storage_key, SnapshotStore};
use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sessions needed to finish a chapter
pub const SESSIONS_PER_CHAPTER: u32 = 20;
/// Missed days per month that do not break a streak
pub const GRACE_DAYS_PER_MONTH: u32 = 2;
/// XP on top of one per exercise
pub const SESSION_XP_BONUS: u32 = 3;

/// Store key of the motivation record
pub fn motivation_key() -> String {
    storage_key("motivation")
}

/// A badge that can be unlocked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const BADGES: &[Badge] = &[
    Badge { id: "first_session", name: "First Steps", description: "Complete your first session" },
    Badge { id: "hat_trick", name: "Hat Trick", description: "Complete 3 sessions in a week" },
    Badge { id: "ten_strong", name: "Ten Strong", description: "Complete 10 total sessions" },
    Badge { id: "quarter_century", name: "Quarter Century", description: "Complete 25 total sessions" },
    Badge { id: "fifty_fine", name: "Fifty Fine", description: "Complete 50 total sessions" },
    Badge { id: "century_wolf", name: "Century Wolf", description: "Complete 100 total sessions" },
];

pub const STICKERS: &[&str] = &[
    "sticker_acorn",
    "sticker_butterfly",
    "sticker_feather_blue",
    "sticker_leaf_gold",
    "sticker_moon_crescent",
    "sticker_owl",
    "sticker_tree_pine",
    "sticker_wolf_paw",
];

/// A chapter of the story, unlocked by finishing sessions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chapter {
    pub number: u32,
    pub title: &'static str,
}

pub const CHAPTERS: &[Chapter] = &[
    Chapter { number: 1, title: "Learning the Steps" },
    Chapter { number: 2, title: "Steady Feet" },
    Chapter { number: 3, title: "Strong Ankles" },
    Chapter { number: 4, title: "Balanced Explorer" },
    Chapter { number: 5, title: "Smooth Walker" },
    Chapter { number: 6, title: "Penguin Pro" },
];

pub fn badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|b| b.id == id)
}

pub fn chapter(number: u32) -> Option<&'static Chapter> {
    CHAPTERS.iter().find(|c| c.number == number)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockedBadge {
    pub id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Everything the motivation layer remembers between sessions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotivationState {
    pub total_sessions: u32,
    pub sessions_by_date: BTreeSet<NaiveDate>,
    pub current_streak: u32,
    pub last_session_date: Option<NaiveDate>,
    pub grace_days_used_this_month: u32,
    /// (year, month) the grace counter belongs to
    pub last_grace_month: Option<(i32, u32)>,
    pub badges_unlocked: Vec<UnlockedBadge>,
    pub xp_total: u32,
    pub current_chapter: u32,
    pub chapter_progress: u32,
    pub collected_stickers: Vec<String>,
    pub last_sticker_date: Option<NaiveDate>,
}

impl Default for MotivationState {
    fn default() -> Self {
        Self {
            total_sessions: 0,
            sessions_by_date: BTreeSet::new(),
            current_streak: 0,
            last_session_date: None,
            grace_days_used_this_month: 0,
            last_grace_month: None,
            badges_unlocked: Vec::new(),
            xp_total: 0,
            current_chapter: 1,
            chapter_progress: 0,
            collected_stickers: Vec::new(),
            last_sticker_date: None,
        }
    }
}

/// What a finished session earned
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub new_badges: Vec<String>,
    pub new_sticker: Option<String>,
    pub total_sessions: u32,
    pub streak: u32,
    pub xp_total: u32,
    pub chapter: u32,
}

/// Receiver of the "session completed" event
pub trait Motivator {
    fn on_session_complete(&mut self, exercise_count: u32) -> Rewards;
}

impl MotivationState {
    /// Load from `store`, falling back to defaults for a missing or broken record.
    pub fn load(store: &dyn SnapshotStore) -> Self {
        match store.load(&motivation_key()) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse motivation data: {}. Using defaults.", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn save(&self, store: &mut dyn SnapshotStore) {
        match serde_json::to_value(self) {
            Ok(value) => store.save(&motivation_key(), &value),
            Err(e) => tracing::warn!("Failed to encode motivation data: {}", e),
        }
    }

    /// Record a finished session on `today`.
    pub fn complete_session<R: Rng + ?Sized>(
        &mut self,
        exercise_count: u32,
        today: NaiveDate,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Rewards {
        self.total_sessions += 1;
        self.update_streak(today);
        self.update_experience(exercise_count);
        let new_sticker = self.award_sticker(today, rng);
        let new_badges = self.check_badges(today, now);

        tracing::info!(
            "Session #{} recorded: streak {}, {} XP",
            self.total_sessions,
            self.current_streak,
            self.xp_total
        );

        Rewards {
            new_badges,
            new_sticker,
            total_sessions: self.total_sessions,
            streak: self.current_streak,
            xp_total: self.xp_total,
            chapter: self.current_chapter,
        }
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges_unlocked.iter().any(|b| b.id == id)
    }

    fn update_streak(&mut self, today: NaiveDate) {
        let month = (today.year(), today.month());
        if self.last_grace_month != Some(month) {
            self.grace_days_used_this_month = 0;
            self.last_grace_month = Some(month);
        }

        match self.last_session_date {
            Some(last) if last == today => return,
            None => self.current_streak = 1,
            Some(last) => {
                let gap = (today - last).num_days().unsigned_abs() as u32;
                if gap == 1 {
                    self.current_streak += 1;
                } else {
                    let missed = gap.saturating_sub(1);
                    if self.grace_days_used_this_month + missed <= GRACE_DAYS_PER_MONTH {
                        self.grace_days_used_this_month += missed;
                        self.current_streak += 1;
                    } else {
                        self.current_streak = 1;
                    }
                }
            }
        }

        self.last_session_date = Some(today);
        self.sessions_by_date.insert(today);
    }

    fn update_experience(&mut self, exercise_count: u32) {
        self.xp_total += exercise_count + SESSION_XP_BONUS;
        self.chapter_progress += 1;

        let last_chapter = CHAPTERS.len() as u32;
        if self.chapter_progress >= SESSIONS_PER_CHAPTER && self.current_chapter < last_chapter {
            self.current_chapter += 1;
            self.chapter_progress = 0;
        }
    }

    fn award_sticker<R: Rng + ?Sized>(&mut self, today: NaiveDate, rng: &mut R) -> Option<String> {
        if self.last_sticker_date == Some(today) {
            return None;
        }

        let available: Vec<&str> = STICKERS
            .iter()
            .copied()
            .filter(|s| !self.collected_stickers.iter().any(|c| c == s))
            .collect();
        let pool = if available.is_empty() { STICKERS.to_vec() } else { available };

        let sticker = pool.choose(rng)?.to_string();
        self.collected_stickers.push(sticker.clone());
        self.last_sticker_date = Some(today);
        Some(sticker)
    }

    fn check_badges(&mut self, today: NaiveDate, now: DateTime<Utc>) -> Vec<String> {
        let week_start = today - chrono::Duration::days(6);
        let days_this_week = self.sessions_by_date.range(week_start..=today).count();

        let mut new_badges = Vec::new();
        for badge in BADGES {
            if self.has_badge(badge.id) {
                continue;
            }

            let unlocked = match badge.id {
                "first_session" => self.total_sessions >= 1,
                "hat_trick" => days_this_week >= 3,
                "ten_strong" => self.total_sessions >= 10,
                "quarter_century" => self.total_sessions >= 25,
                "fifty_fine" => self.total_sessions >= 50,
                "century_wolf" => self.total_sessions >= 100,
                _ => false,
            };

            if unlocked {
                self.badges_unlocked.push(UnlockedBadge {
                    id: badge.id.to_string(),
                    unlocked_at: now,
                });
                new_badges.push(badge.id.to_string());
            }
        }
        new_badges
    }
}

/// Motivation collaborator persisted through a [`SnapshotStore`]
pub struct MotivationTracker {
    store: Box<dyn SnapshotStore>,
    state: MotivationState,
}

impl MotivationTracker {
    pub fn new(store: Box<dyn SnapshotStore>) -> Self {
        let state = MotivationState::load(store.as_ref());
        Self { store, state }
    }

    pub fn state(&self) -> &MotivationState {
        &self.state
    }

    /// Forget all progress. Asking the user first is the caller's job.
    pub fn reset(&mut self) {
        self.state = MotivationState::default();
        self.state.save(self.store.as_mut());
        tracing::info!("Motivation data reset");
    }
}

impl Motivator for MotivationTracker {
    fn on_session_complete(&mut self, exercise_count: u32) -> Rewards {
        // Reload so two processes finishing sessions do not clobber each other.
        self.state = MotivationState::load(self.store.as_ref());
        let today = Local::now().date_naive();
        let rewards =
            self.state
                .complete_session(exercise_count, today, Utc::now(), &mut rand::thread_rng());
        self.state.save(self.store.as_mut());
        rewards
    }
}
