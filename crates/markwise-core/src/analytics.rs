//! Performance analytics over a student's graded-answer history.
//!
//! Every operation is a pure function of the history snapshot and the
//! reference instant `as_of`; calling one twice yields the same output.
//! An empty history is a valid input and produces zero/empty aggregates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{HistoryEntry, PASS_THRESHOLD};

/// Number of weekly buckets in the trend, including the current week.
pub const TREND_WEEKS: usize = 6;
/// Answers per week the weekly goal asks for.
pub const WEEKLY_ANSWER_TARGET: u32 = 20;
/// Average score the monthly goal asks for.
pub const MONTHLY_SCORE_TARGET: u32 = 90;
/// Subjects averaging at or above this are strong.
pub const STRONG_SUBJECT_THRESHOLD: f64 = 85.0;
/// How many recent answers decide whether to suggest advanced topics.
pub const RECENT_WINDOW: usize = 10;

// Study-insight figures that are not derived from history.
pub const OPTIMAL_SESSION_LENGTH: &str = "25-30 minutes";
pub const AVERAGE_QUESTIONS_PER_SESSION: f64 = 5.2;
pub const LEARNING_STYLE: &str = "Visual + Practice";
pub const RETENTION_ESTIMATE: u32 = 89;

/// One weekly bucket of the score trend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyTrendPoint {
    /// "Week 1" (oldest) through "Week 6" (current).
    pub label: String,
    /// Monday that opens this week, in local time.
    pub week_start: NaiveDate,
    /// Rounded mean score, 0 if the week is empty.
    pub score: u32,
    pub count: usize,
}

/// Score change from the first to the last point of a trend.
pub fn trend_change(points: &[WeeklyTrendPoint]) -> i64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => last.score as i64 - first.score as i64,
        _ => 0,
    }
}

/// How a subject's average compares to the pass and mastery marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectStanding {
    Weak,
    Developing,
    Strong,
}

impl SubjectStanding {
    fn from_mean(mean: f64) -> Self {
        if mean < PASS_THRESHOLD as f64 {
            SubjectStanding::Weak
        } else if mean < STRONG_SUBJECT_THRESHOLD {
            SubjectStanding::Developing
        } else {
            SubjectStanding::Strong
        }
    }
}

impl fmt::Display for SubjectStanding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectStanding::Weak => write!(f, "weak"),
            SubjectStanding::Developing => write!(f, "developing"),
            SubjectStanding::Strong => write!(f, "strong"),
        }
    }
}

/// Aggregate performance in one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectPerformancePoint {
    pub subject: String,
    /// Rounded mean score.
    pub score: u32,
    pub count: usize,
    pub standing: SubjectStanding,
}

/// A prioritized suggestion for what to study next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommendation: String,
    pub reason: String,
    /// 1 (low) to 5 (most urgent).
    pub priority: u8,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Local time-of-day windows used by study insights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 4] = [
        TimeWindow::Morning,
        TimeWindow::Afternoon,
        TimeWindow::Evening,
        TimeWindow::Night,
    ];

    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeWindow::Morning,
            12..=17 => TimeWindow::Afternoon,
            18..=23 => TimeWindow::Evening,
            _ => TimeWindow::Night,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::Morning => write!(f, "Morning (6 AM - 12 PM)"),
            TimeWindow::Afternoon => write!(f, "Afternoon (12 PM - 6 PM)"),
            TimeWindow::Evening => write!(f, "Evening (6 PM - 12 AM)"),
            TimeWindow::Night => write!(f, "Night (12 AM - 6 AM)"),
        }
    }
}

/// Mean score of the answers given in one time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindowStats {
    pub window: TimeWindow,
    pub score: u32,
    pub count: usize,
}

/// When the student performs best, plus fixed study-habit figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyInsights {
    /// Window with the highest mean score; `None` without history.
    pub best_study_time: Option<TimeWindow>,
    /// Rounded mean score in the best window, 0 without history.
    pub best_study_score: u32,
    /// Per-window stats for windows that have answers.
    pub windows: Vec<TimeWindowStats>,
    pub optimal_session_length: String,
    pub average_questions_per_session: f64,
    pub learning_style: String,
    pub retention_score: u32,
}

/// Progress toward one fixed goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalProgress {
    pub description: String,
    pub current: u32,
    pub target: u32,
    /// Percentage toward the target, capped at 100.
    pub progress: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyGoals {
    pub weekly_goal: GoalProgress,
    pub monthly_goal: GoalProgress,
}

/// Headline numbers for a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_answers: usize,
    /// Mean score rounded to two decimals.
    pub average_score: f64,
    pub passed: usize,
    /// Share of passed answers as a rounded percentage.
    pub pass_rate: u32,
    pub total_time_spent_secs: u64,
    /// Consecutive local days with at least one answer, ending today or
    /// yesterday.
    pub study_streak_days: u32,
}

fn mean(scores: impl IntoIterator<Item = u32>) -> Option<f64> {
    let (sum, count) = scores
        .into_iter()
        .fold((0u64, 0usize), |(sum, count), s| (sum + s as u64, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

fn percent_of(value: f64, target: f64) -> u32 {
    ((value / target * 100.0).round() as u32).min(100)
}

/// Analytics over an immutable history snapshot.
#[derive(Debug, Clone)]
pub struct PerformanceAnalytics<'a> {
    history: &'a [HistoryEntry],
    as_of: DateTime<Utc>,
    offset: FixedOffset,
}

impl<'a> PerformanceAnalytics<'a> {
    /// Analyze `history` as seen at `as_of`, with local time equal to UTC.
    pub fn new(history: &'a [HistoryEntry], as_of: DateTime<Utc>) -> Self {
        Self {
            history,
            as_of,
            offset: Utc.fix(),
        }
    }

    /// Use `offset` as the student's local time for week boundaries,
    /// days, and time-of-day windows.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    fn local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    fn today(&self) -> NaiveDate {
        self.local(self.as_of).date_naive()
    }

    fn created_within(&self, days: i64) -> impl Iterator<Item = &'a HistoryEntry> {
        let since = self.as_of - Duration::days(days);
        let until = self.as_of;
        let history = self.history;
        history.iter().filter(move |e| {
            let created = e.record.created_at();
            created > since && created <= until
        })
    }

    /// Mean score and count per local week, oldest first, over the last
    /// [`TREND_WEEKS`] calendar weeks (Monday start) including this one.
    pub fn weekly_trend(&self) -> Vec<WeeklyTrendPoint> {
        let today = self.today();
        let this_week = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let first_week = this_week - Duration::weeks(TREND_WEEKS as i64 - 1);

        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); TREND_WEEKS];
        for entry in self.history {
            let day = self.local(entry.record.created_at()).date_naive();
            if day < first_week {
                continue;
            }
            let index = ((day - first_week).num_days() / 7) as usize;
            if let Some(bucket) = buckets.get_mut(index) {
                bucket.push(entry.record.score());
            }
        }

        buckets
            .into_iter()
            .enumerate()
            .map(|(i, scores)| WeeklyTrendPoint {
                label: format!("Week {}", i + 1),
                week_start: first_week + Duration::weeks(i as i64),
                count: scores.len(),
                score: mean(scores).map(|m| m.round() as u32).unwrap_or(0),
            })
            .collect()
    }

    fn subject_means(&self) -> BTreeMap<&'a str, (f64, usize)> {
        let mut grouped: BTreeMap<&'a str, Vec<u32>> = BTreeMap::new();
        for entry in self.history {
            grouped
                .entry(entry.subject.as_str())
                .or_default()
                .push(entry.record.score());
        }
        grouped
            .into_iter()
            .filter_map(|(subject, scores)| {
                let count = scores.len();
                mean(scores).map(|m| (subject, (m, count)))
            })
            .collect()
    }

    /// Mean score and count per subject, best subject first.
    pub fn subject_performance(&self) -> Vec<SubjectPerformancePoint> {
        let mut means: Vec<(&str, f64, usize)> = self
            .subject_means()
            .into_iter()
            .map(|(subject, (m, count))| (subject, m, count))
            .collect();
        // Ties keep the alphabetical order from the BTreeMap.
        means.sort_by(|a, b| b.1.total_cmp(&a.1));

        means
            .into_iter()
            .map(|(subject, m, count)| SubjectPerformancePoint {
                subject: subject.to_string(),
                score: m.round() as u32,
                count,
                standing: SubjectStanding::from_mean(m),
            })
            .collect()
    }

    /// Subjects needing attention, most urgent first, at most `limit`.
    ///
    /// Without any history, returns onboarding suggestions instead.
    pub fn weakness_recommendations(&self, limit: usize) -> Vec<Recommendation> {
        if self.history.is_empty() {
            return onboarding_recommendations().into_iter().take(limit).collect();
        }

        let mut recommendations: Vec<Recommendation> = self
            .subject_means()
            .into_iter()
            .filter(|(_, (m, _))| *m < PASS_THRESHOLD as f64)
            .map(|(subject, (m, _))| {
                let priority = (5 - (m / 20.0).floor() as i64).clamp(1, 5) as u8;
                Recommendation {
                    recommendation: format!("Focus on {subject}"),
                    reason: format!(
                        "{subject} average is {}%, below the {PASS_THRESHOLD}% pass mark",
                        m.round()
                    ),
                    priority,
                    subject: Some(subject.to_string()),
                }
            })
            .collect();

        let mut recent: Vec<&HistoryEntry> = self.history.iter().collect();
        recent.sort_by_key(|e| std::cmp::Reverse(e.record.created_at()));
        recent.truncate(RECENT_WINDOW);
        if let Some(recent_mean) = mean(recent.iter().map(|e| e.record.score())) {
            if recent_mean > STRONG_SUBJECT_THRESHOLD {
                recommendations.push(Recommendation {
                    recommendation: "Try advanced topics".to_string(),
                    reason: format!(
                        "Your last {} answers average {}%",
                        recent.len(),
                        recent_mean.round()
                    ),
                    priority: 2,
                    subject: None,
                });
            }
        }

        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));
        recommendations.truncate(limit);
        recommendations
    }

    /// Best local time-of-day window by mean score.
    pub fn study_insights(&self) -> StudyInsights {
        let mut grouped: BTreeMap<TimeWindow, Vec<u32>> = BTreeMap::new();
        for entry in self.history {
            let hour = self.local(entry.record.created_at()).hour();
            grouped
                .entry(TimeWindow::from_hour(hour))
                .or_default()
                .push(entry.record.score());
        }

        let windows: Vec<(TimeWindow, f64, usize)> = TimeWindow::ALL
            .iter()
            .filter_map(|w| {
                let scores = grouped.remove(w)?;
                let count = scores.len();
                mean(scores).map(|m| (*w, m, count))
            })
            .collect();

        // First window wins a tie.
        let best = windows
            .iter()
            .fold(None::<&(TimeWindow, f64, usize)>, |best, w| match best {
                Some(b) if b.1 >= w.1 => Some(b),
                _ => Some(w),
            });

        StudyInsights {
            best_study_time: best.map(|b| b.0),
            best_study_score: best.map(|b| b.1.round() as u32).unwrap_or(0),
            windows: windows
                .iter()
                .map(|(window, m, count)| TimeWindowStats {
                    window: *window,
                    score: m.round() as u32,
                    count: *count,
                })
                .collect(),
            optimal_session_length: OPTIMAL_SESSION_LENGTH.to_string(),
            average_questions_per_session: AVERAGE_QUESTIONS_PER_SESSION,
            learning_style: LEARNING_STYLE.to_string(),
            retention_score: RETENTION_ESTIMATE,
        }
    }

    /// Progress toward the fixed weekly volume and monthly score goals.
    pub fn study_goals(&self) -> StudyGoals {
        let weekly_count = self.created_within(7).count() as u32;
        let monthly_mean = mean(self.created_within(30).map(|e| e.record.score())).unwrap_or(0.0);

        StudyGoals {
            weekly_goal: GoalProgress {
                description: format!("Complete {WEEKLY_ANSWER_TARGET} questions this week"),
                current: weekly_count,
                target: WEEKLY_ANSWER_TARGET,
                progress: percent_of(weekly_count as f64, WEEKLY_ANSWER_TARGET as f64),
            },
            monthly_goal: GoalProgress {
                description: format!("Achieve {MONTHLY_SCORE_TARGET}% average score"),
                current: monthly_mean.round() as u32,
                target: MONTHLY_SCORE_TARGET,
                progress: percent_of(monthly_mean, MONTHLY_SCORE_TARGET as f64),
            },
        }
    }

    /// Totals, pass rate, and the current study streak.
    pub fn progress_summary(&self) -> ProgressSummary {
        let total = self.history.len();
        let passed = self.history.iter().filter(|e| e.record.passed()).count();
        let average = mean(self.history.iter().map(|e| e.record.score())).unwrap_or(0.0);

        ProgressSummary {
            total_answers: total,
            average_score: (average * 100.0).round() / 100.0,
            passed,
            pass_rate: if total == 0 {
                0
            } else {
                percent_of(passed as f64, total as f64)
            },
            total_time_spent_secs: self.history.iter().map(|e| e.record.time_spent_secs()).sum(),
            study_streak_days: self.study_streak(),
        }
    }

    fn study_streak(&self) -> u32 {
        let days: BTreeSet<NaiveDate> = self
            .history
            .iter()
            .map(|e| self.local(e.record.created_at()).date_naive())
            .collect();

        let today = self.today();
        let mut day = if days.contains(&today) {
            today
        } else {
            today - Duration::days(1)
        };
        let mut streak = 0;
        while days.contains(&day) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }
}

fn onboarding_recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            recommendation: "Start with a practice question".to_string(),
            reason: "Answer a few questions so we can learn your strengths".to_string(),
            priority: 3,
            subject: None,
        },
        Recommendation {
            recommendation: "Set a weekly study routine".to_string(),
            reason: format!(
                "Aim for {WEEKLY_ANSWER_TARGET} questions a week to build momentum"
            ),
            priority: 2,
            subject: None,
        },
    ]
}
