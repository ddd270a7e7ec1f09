//! The `markwise progress` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use comfy_table::{Cell, Table};

use markwise_core::analytics::{trend_change, PerformanceAnalytics};
use markwise_core::dashboard::Dashboard;
use markwise_core::history::HistorySnapshot;
use markwise_core::traits::HistoryProvider;
use markwise_judges::config::load_config_from;

/// Arguments of one `progress` invocation.
pub struct ProgressArgs {
    pub history: Option<PathBuf>,
    pub student: String,
    pub limit: usize,
    pub as_of: Option<DateTime<Utc>>,
    pub utc_offset: Option<FixedOffset>,
    pub config: Option<PathBuf>,
    pub format: String,
}

pub fn execute(args: ProgressArgs) -> Result<()> {
    let history_path = match args.history {
        Some(path) => path,
        None => load_config_from(args.config.as_deref())?
            .history_file(None)
            .context("no history file: pass --history or set history_path in markwise.toml")?,
    };

    let snapshot = HistorySnapshot::load_json(&history_path)?;
    let entries = snapshot.answers_for(&args.student)?;
    let mut analytics =
        PerformanceAnalytics::new(&entries, args.as_of.unwrap_or_else(Utc::now));
    if let Some(offset) = args.utc_offset {
        analytics = analytics.with_utc_offset(offset);
    }
    let dashboard = Dashboard::build(args.student, &analytics, args.limit);

    match args.format.as_str() {
        "markdown" | "md" => println!("{}", dashboard.to_markdown()),
        "json" => println!("{}", serde_json::to_string_pretty(&dashboard)?),
        "text" => print_dashboard(&dashboard),
        other => anyhow::bail!("unknown format '{other}', expected text, json or markdown"),
    }

    Ok(())
}

fn print_dashboard(dashboard: &Dashboard) {
    let summary = &dashboard.summary;
    println!("Progress for {}", dashboard.student_id);
    println!(
        "{} answers, {:.2}% average, {}/{} passed ({}%), {} day streak",
        summary.total_answers,
        summary.average_score,
        summary.passed,
        summary.total_answers,
        summary.pass_rate,
        summary.study_streak_days
    );

    let mut trend = Table::new();
    trend.set_header(vec!["Week", "Starting", "Score", "Answers"]);
    for point in &dashboard.weekly_trend {
        trend.add_row(vec![
            Cell::new(&point.label),
            Cell::new(point.week_start),
            Cell::new(format!("{}%", point.score)),
            Cell::new(point.count),
        ]);
    }
    println!("\n{trend}");
    println!("Change: {:+}%", trend_change(&dashboard.weekly_trend));

    if !dashboard.subjects.is_empty() {
        let mut subjects = Table::new();
        subjects.set_header(vec!["Subject", "Score", "Answers", "Standing"]);
        for s in &dashboard.subjects {
            subjects.add_row(vec![
                Cell::new(&s.subject),
                Cell::new(format!("{}%", s.score)),
                Cell::new(s.count),
                Cell::new(s.standing),
            ]);
        }
        println!("\n{subjects}");
    }

    if !dashboard.recommendations.is_empty() {
        println!("\nRecommendations:");
        for r in &dashboard.recommendations {
            println!("  [P{}] {}: {}", r.priority, r.recommendation, r.reason);
        }
    }

    let insights = &dashboard.insights;
    println!("\nStudy insights:");
    match insights.best_study_time {
        Some(window) => println!(
            "  Best study time: {window} ({}% average)",
            insights.best_study_score
        ),
        None => println!("  Best study time: not enough answers yet"),
    }
    println!(
        "  Optimal session: {}, about {} questions per session",
        insights.optimal_session_length, insights.average_questions_per_session
    );
    println!(
        "  Learning style: {}, retention {}%",
        insights.learning_style, insights.retention_score
    );

    println!("\nGoals:");
    for goal in [&dashboard.goals.weekly_goal, &dashboard.goals.monthly_goal] {
        println!(
            "  {}: {}/{} ({}%)",
            goal.description, goal.current, goal.target, goal.progress
        );
    }
}
