//! Daily reflection: one summary per day with a few insights about study,
//! slacking and mood. Written by the deep-sleep consolidation job.

use chrono::{DateTime, NaiveDate, Utc};
use petmind_core::storage::{load_json_or_warn, save_json};
use petmind_core::{KeyValueStore, Sensors};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Persistence key for summaries and insights.
pub const REFLECTION_KEY: &str = "reflection_data";

const MAX_SUMMARIES: usize = 30;
const MAX_INSIGHTS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Pattern,
    Progress,
    Warning,
    Suggestion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub study_minutes: u32,
    pub idle_minutes: u32,
    pub level: u32,
    pub mood: u32,
    pub insights: Vec<Insight>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReflectionData {
    #[serde(default)]
    summaries: Vec<DailySummary>,
    #[serde(default)]
    insights: Vec<Insight>,
    #[serde(default)]
    last_reflection_date: Option<NaiveDate>,
}

#[derive(Default)]
pub struct ReflectionJournal {
    persistence: Option<Arc<dyn KeyValueStore>>,
    data: ReflectionData,
}

impl ReflectionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_persistence(persistence: Arc<dyn KeyValueStore>) -> Self {
        let data = load_json_or_warn(persistence.as_ref(), REFLECTION_KEY).unwrap_or_default();
        Self {
            persistence: Some(persistence),
            data,
        }
    }

    pub fn summaries(&self) -> &[DailySummary] {
        &self.data.summaries
    }

    /// The latest `limit` insights, oldest first.
    pub fn recent_insights(&self, limit: usize) -> &[Insight] {
        let skip = self.data.insights.len().saturating_sub(limit);
        &self.data.insights[skip..]
    }

    pub fn has_reflected_on(&self, date: NaiveDate) -> bool {
        self.data.last_reflection_date == Some(date)
    }

    /// Summarise the day from growth sensors. At most one summary per day:
    /// a second call on the same date returns the existing summary and
    /// `false`.
    pub fn generate_daily_summary(
        &mut self,
        sensors: &Sensors,
        now: DateTime<Utc>,
    ) -> (DailySummary, bool) {
        let today = now.date_naive();
        if self.has_reflected_on(today) {
            if let Some(existing) = self.data.summaries.last() {
                return (existing.clone(), false);
            }
        }

        let insights = derive_insights(sensors, now);
        let summary = DailySummary {
            date: today,
            created_at: now,
            study_minutes: sensors.today_study_minutes,
            idle_minutes: sensors.today_idle_minutes,
            level: sensors.level,
            mood: sensors.mood,
            insights: insights.clone(),
        };

        self.data.summaries.push(summary.clone());
        if self.data.summaries.len() > MAX_SUMMARIES {
            let excess = self.data.summaries.len() - MAX_SUMMARIES;
            self.data.summaries.drain(..excess);
        }
        self.data.insights.extend(insights);
        if self.data.insights.len() > MAX_INSIGHTS {
            let excess = self.data.insights.len() - MAX_INSIGHTS;
            self.data.insights.drain(..excess);
        }
        self.data.last_reflection_date = Some(today);

        info!(%today, insights = summary.insights.len(), "Daily summary written");
        self.save();
        (summary, true)
    }

    fn save(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = save_json(store.as_ref(), REFLECTION_KEY, &self.data) {
            warn!(error = %e, "Failed to persist reflection data");
        }
    }
}

fn derive_insights(sensors: &Sensors, now: DateTime<Utc>) -> Vec<Insight> {
    let mut insights = Vec::new();
    let mut push = |kind, content: &str| {
        insights.push(Insight {
            kind,
            content: content.to_string(),
            created_at: now,
        })
    };

    let study = sensors.today_study_minutes;
    let idle = sensors.today_idle_minutes;
    if study > 60 {
        push(InsightKind::Progress, "今天学习超过1小时，太棒了！");
    }
    if idle > study.saturating_mul(2) {
        push(InsightKind::Warning, "今天摸鱼时间是学习的2倍以上，要注意哦");
    }
    if sensors.mood > 80 {
        push(InsightKind::Progress, "心情很好！继续保持");
    } else if sensors.mood < 30 {
        push(InsightKind::Suggestion, "心情不太好，多休息休息吧");
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use petmind_core::{Clock, InMemoryStore, ManualClock};

    fn sensors(study: u32, idle: u32, mood: u32) -> Sensors {
        Sensors {
            today_study_minutes: study,
            today_idle_minutes: idle,
            mood,
            ..Sensors::default()
        }
    }

    #[test]
    fn insights_follow_the_day() {
        let now = ManualClock::at_hour(2).now();
        let kinds = |s: &Sensors| {
            derive_insights(s, now)
                .into_iter()
                .map(|i| i.kind)
                .collect::<Vec<_>>()
        };
        assert_eq!(
            kinds(&sensors(90, 10, 85)),
            vec![InsightKind::Progress, InsightKind::Progress]
        );
        assert_eq!(
            kinds(&sensors(10, 30, 20)),
            vec![InsightKind::Warning, InsightKind::Suggestion]
        );
        assert!(kinds(&sensors(0, 0, 50)).is_empty());
    }

    #[test]
    fn one_summary_per_day() {
        let clock = ManualClock::at_hour(2);
        let mut journal = ReflectionJournal::new();
        let (first, written) = journal.generate_daily_summary(&sensors(90, 0, 50), clock.now());
        assert!(written);

        clock.advance(Duration::hours(3));
        let (again, written) = journal.generate_daily_summary(&sensors(0, 0, 10), clock.now());
        assert!(!written);
        assert_eq!(again, first);

        clock.advance(Duration::days(1));
        let (_, written) = journal.generate_daily_summary(&sensors(0, 0, 10), clock.now());
        assert!(written);
        assert_eq!(journal.summaries().len(), 2);
    }

    #[test]
    fn bounded_and_persisted() {
        let clock = ManualClock::at_hour(2);
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let mut journal = ReflectionJournal::with_persistence(kv.clone());
        for _ in 0..40 {
            journal.generate_daily_summary(&sensors(90, 500, 90), clock.now());
            clock.advance(Duration::days(1));
        }
        assert_eq!(journal.summaries().len(), MAX_SUMMARIES);
        assert_eq!(journal.recent_insights(100).len(), MAX_INSIGHTS);

        let reloaded = ReflectionJournal::with_persistence(kv);
        assert_eq!(reloaded.summaries().len(), MAX_SUMMARIES);
        assert_eq!(reloaded.recent_insights(5).len(), 5);
    }
}
