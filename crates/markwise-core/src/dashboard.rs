//! A student's full progress dashboard, with markdown rendering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{
    trend_change, PerformanceAnalytics, ProgressSummary, Recommendation, StudyGoals,
    StudyInsights, SubjectPerformancePoint, WeeklyTrendPoint,
};

/// Every analytics aggregate for one student at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub student_id: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ProgressSummary,
    pub weekly_trend: Vec<WeeklyTrendPoint>,
    pub subjects: Vec<SubjectPerformancePoint>,
    pub recommendations: Vec<Recommendation>,
    pub insights: StudyInsights,
    pub goals: StudyGoals,
}

impl Dashboard {
    /// Compute every aggregate from `analytics`, keeping at most
    /// `recommendation_limit` recommendations.
    pub fn build(
        student_id: impl Into<String>,
        analytics: &PerformanceAnalytics<'_>,
        recommendation_limit: usize,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            generated_at: analytics.as_of(),
            summary: analytics.progress_summary(),
            weekly_trend: analytics.weekly_trend(),
            subjects: analytics.subject_performance(),
            recommendations: analytics.weakness_recommendations(recommendation_limit),
            insights: analytics.study_insights(),
            goals: analytics.study_goals(),
        }
    }

    /// Format the dashboard as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## Progress for {}\n\n", self.student_id));
        md.push_str(&format!(
            "**Summary:** {} answers, {:.2}% average, {}% passed, {} day streak\n\n",
            self.summary.total_answers,
            self.summary.average_score,
            self.summary.pass_rate,
            self.summary.study_streak_days
        ));

        md.push_str("### Weekly trend\n\n");
        md.push_str("| Week | Starting | Score | Answers |\n");
        md.push_str("|------|----------|-------|---------|\n");
        for p in &self.weekly_trend {
            md.push_str(&format!(
                "| {} | {} | {}% | {} |\n",
                p.label, p.week_start, p.score, p.count
            ));
        }
        md.push_str(&format!(
            "\nChange: {:+}%\n\n",
            trend_change(&self.weekly_trend)
        ));

        if !self.subjects.is_empty() {
            md.push_str("### Subjects\n\n");
            md.push_str("| Subject | Score | Answers | Standing |\n");
            md.push_str("|---------|-------|---------|----------|\n");
            for s in &self.subjects {
                md.push_str(&format!(
                    "| {} | {}% | {} | {} |\n",
                    s.subject, s.score, s.count, s.standing
                ));
            }
            md.push('\n');
        }

        if !self.recommendations.is_empty() {
            md.push_str("### Recommendations\n\n");
            for r in &self.recommendations {
                md.push_str(&format!(
                    "- **[P{}] {}**: {}\n",
                    r.priority, r.recommendation, r.reason
                ));
            }
            md.push('\n');
        }

        md.push_str("### Study insights\n\n");
        match self.insights.best_study_time {
            Some(window) => md.push_str(&format!(
                "- Best study time: {} ({}% average)\n",
                window, self.insights.best_study_score
            )),
            None => md.push_str("- Best study time: not enough answers yet\n"),
        }
        md.push_str(&format!(
            "- Optimal session: {}\n- Retention: {}%\n\n",
            self.insights.optimal_session_length, self.insights.retention_score
        ));

        md.push_str("### Goals\n\n");
        for goal in [&self.goals.weekly_goal, &self.goals.monthly_goal] {
            md.push_str(&format!("- {}: {}%\n", goal.description, goal.progress));
        }

        md
    }
}
