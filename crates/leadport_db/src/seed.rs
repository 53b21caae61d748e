//! Synthetic CRM data for development databases.
//!
//! Row generation is separate from insertion: [`SeedGenerator`] produces rows
//! from a random source and the ids of already-inserted parents, and
//! [`seed_database`] inserts them phase by phase, feeding each phase the ids
//! the previous one got back from `RETURNING id`.

use std::collections::HashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;

use chrono::{NaiveDateTime, TimeDelta, Utc};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Paragraph;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::seq::IndexedRandom;
use rand::Rng;
use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::schema::apply_schema;

const MAX_EMAIL_ATTEMPTS: usize = 16;

/// Lifecycle state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Rejected,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Converted,
        LeadStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Converted => "converted",
            LeadStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much data to generate and what it looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedConfig {
    pub agents: RangeInclusive<usize>,
    pub leads: RangeInclusive<usize>,
    pub feedback: RangeInclusive<usize>,
    /// Chance that a lead is assigned to an agent.
    pub assign_probability: f64,
    /// Leads are created within this window before now.
    pub lead_window: TimeDelta,
    /// Feedback is submitted within this window before now.
    pub feedback_window: TimeDelta,
    pub ratings: RangeInclusive<i32>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            agents: 5..=8,
            leads: 20..=30,
            feedback: 10..=15,
            assign_probability: 0.7,
            lead_window: TimeDelta::days(180),
            feedback_window: TimeDelta::days(90),
            ratings: 1..=5,
        }
    }
}

impl SeedConfig {
    pub fn validate(&self) -> DbResult<()> {
        for (name, range) in [
            ("agents", &self.agents),
            ("leads", &self.leads),
            ("feedback", &self.feedback),
        ] {
            if range.is_empty() {
                return Err(DbError::invalid_data(format!(
                    "{} count range {:?} is empty",
                    name, range
                )));
            }
        }
        if self.ratings.is_empty() {
            return Err(DbError::invalid_data(format!(
                "rating range {:?} is empty",
                self.ratings
            )));
        }
        if !(0.0..=1.0).contains(&self.assign_probability) {
            return Err(DbError::invalid_data(format!(
                "assign probability {} is outside 0..=1",
                self.assign_probability
            )));
        }
        if self.lead_window < TimeDelta::zero() || self.feedback_window < TimeDelta::zero() {
            return Err(DbError::invalid_data("time windows must not be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLead {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub status: LeadStatus,
    pub created_at: NaiveDateTime,
    pub assigned_agent_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub lead_id: i32,
    pub agent_id: i32,
    pub rating: i32,
    pub comments: String,
    pub submitted_at: NaiveDateTime,
}

/// Produces synthetic rows.
pub struct SeedGenerator<R> {
    rng: R,
    config: SeedConfig,
    now: NaiveDateTime,
    emails: HashSet<String>,
}

impl<R: Rng> SeedGenerator<R> {
    pub fn new(rng: R, config: SeedConfig) -> DbResult<Self> {
        config.validate()?;
        Ok(Self {
            rng,
            config,
            now: Utc::now().naive_utc(),
            emails: HashSet::new(),
        })
    }

    /// Pin the reference time timestamps are generated back from.
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn agent_count(&mut self) -> usize {
        self.rng.random_range(self.config.agents.clone())
    }

    pub fn lead_count(&mut self) -> usize {
        self.rng.random_range(self.config.leads.clone())
    }

    pub fn feedback_count(&mut self) -> usize {
        self.rng.random_range(self.config.feedback.clone())
    }

    pub fn agent(&mut self) -> NewAgent {
        NewAgent {
            name: Name().fake_with_rng(&mut self.rng),
            email: self.unique_email(),
        }
    }

    /// A lead, assigned to one of `agent_ids` with the configured probability.
    pub fn lead(&mut self, agent_ids: &[i32]) -> NewLead {
        let full_name: String = Name().fake_with_rng(&mut self.rng);
        let email = self.unique_email();
        let phone: String = PhoneNumber().fake_with_rng(&mut self.rng);
        let status = *LeadStatus::ALL
            .choose(&mut self.rng)
            .unwrap_or(&LeadStatus::New);
        let created_at = self.timestamp_within(self.config.lead_window);

        let assigned_agent_id = if !agent_ids.is_empty()
            && self.rng.random_bool(self.config.assign_probability)
        {
            agent_ids.choose(&mut self.rng).copied()
        } else {
            None
        };

        NewLead {
            full_name,
            email,
            phone,
            status,
            created_at,
            assigned_agent_id,
        }
    }

    /// Feedback on one of `lead_ids` by one of `agent_ids`, or `None` when
    /// either list is empty.
    pub fn feedback(&mut self, lead_ids: &[i32], agent_ids: &[i32]) -> Option<NewFeedback> {
        let lead_id = *lead_ids.choose(&mut self.rng)?;
        let agent_id = *agent_ids.choose(&mut self.rng)?;
        let rating = self.rng.random_range(self.config.ratings.clone());
        let comments: String = Paragraph(2..3).fake_with_rng(&mut self.rng);
        let submitted_at = self.timestamp_within(self.config.feedback_window);

        Some(NewFeedback {
            lead_id,
            agent_id,
            rating,
            comments,
            submitted_at,
        })
    }

    fn unique_email(&mut self) -> String {
        for _ in 0..MAX_EMAIL_ATTEMPTS {
            let email: String = SafeEmail().fake_with_rng(&mut self.rng);
            if self.emails.insert(email.clone()) {
                return email;
            }
        }

        // faker pool exhausted; number the address instead
        let mut n = self.emails.len();
        loop {
            let email = format!("seed{}@example.com", n);
            if self.emails.insert(email.clone()) {
                return email;
            }
            n += 1;
        }
    }

    fn timestamp_within(&mut self, window: TimeDelta) -> NaiveDateTime {
        let offset = self.rng.random_range(0..=window.num_seconds());
        self.now - TimeDelta::seconds(offset)
    }
}

/// A lead as inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededLead {
    pub id: i32,
    pub assigned_agent_id: Option<i32>,
}

/// A feedback row as inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededFeedback {
    pub id: i32,
    pub lead_id: i32,
    pub agent_id: i32,
}

/// What a seeding run inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub agent_ids: Vec<i32>,
    pub leads: Vec<SeededLead>,
    pub feedback: Vec<SeededFeedback>,
    /// Feedback generation stopped early for lack of leads or agents.
    pub feedback_cut_short: bool,
}

impl SeedReport {
    pub fn lead_ids(&self) -> Vec<i32> {
        self.leads.iter().map(|l| l.id).collect()
    }
}

/// Apply `schema`, then insert agents, leads and feedback.
///
/// Each phase runs in its own transaction. Any database error aborts the run;
/// phases already committed stay committed.
pub async fn seed_database<R: Rng>(
    conn: &mut PgConnection,
    schema: &Path,
    generator: &mut SeedGenerator<R>,
) -> DbResult<SeedReport> {
    apply_schema(conn, schema).await?;
    let mut report = SeedReport::default();

    info!("Populating agents table with fake data");
    let count = generator.agent_count();
    let mut tx = conn.begin().await?;
    for _ in 0..count {
        let agent = generator.agent();
        let id = insert_agent(&mut *tx, &agent).await?;
        report.agent_ids.push(id);
    }
    tx.commit().await?;
    info!("Populated {} agents.", report.agent_ids.len());

    info!("Populating leads table with fake data");
    let count = generator.lead_count();
    let mut tx = conn.begin().await?;
    for _ in 0..count {
        let lead = generator.lead(&report.agent_ids);
        let id = insert_lead(&mut *tx, &lead).await?;
        report.leads.push(SeededLead {
            id,
            assigned_agent_id: lead.assigned_agent_id,
        });
    }
    tx.commit().await?;
    info!("Populated {} leads.", report.leads.len());

    info!("Populating feedback table with fake data");
    let count = generator.feedback_count();
    let lead_ids = report.lead_ids();
    let mut tx = conn.begin().await?;
    for _ in 0..count {
        let Some(feedback) = generator.feedback(&lead_ids, &report.agent_ids) else {
            warn!("No feedback created: No leads or agents available.");
            report.feedback_cut_short = true;
            break;
        };
        let id = insert_feedback(&mut *tx, &feedback).await?;
        report.feedback.push(SeededFeedback {
            id,
            lead_id: feedback.lead_id,
            agent_id: feedback.agent_id,
        });
    }
    tx.commit().await?;
    info!("Populated {} feedback entries.", report.feedback.len());

    Ok(report)
}

async fn insert_agent(conn: &mut PgConnection, agent: &NewAgent) -> DbResult<i32> {
    let id: i32 = sqlx::query_scalar("INSERT INTO agents (name, email) VALUES ($1, $2) RETURNING id")
        .bind(&agent.name)
        .bind(&agent.email)
        .fetch_one(&mut *conn)
        .await?;
    debug!(id, email = %agent.email, "Inserted agent");
    Ok(id)
}

async fn insert_lead(conn: &mut PgConnection, lead: &NewLead) -> DbResult<i32> {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO leads (full_name, email, phone, status, created_at, assigned_agent_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&lead.full_name)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(lead.status.as_str())
    .bind(lead.created_at)
    .bind(lead.assigned_agent_id)
    .fetch_one(&mut *conn)
    .await?;
    debug!(id, status = %lead.status, "Inserted lead");
    Ok(id)
}

async fn insert_feedback(conn: &mut PgConnection, feedback: &NewFeedback) -> DbResult<i32> {
    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO feedback (lead_id, agent_id, rating, comments, submitted_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(feedback.lead_id)
    .bind(feedback.agent_id)
    .bind(feedback.rating)
    .bind(&feedback.comments)
    .bind(feedback.submitted_at)
    .fetch_one(&mut *conn)
    .await?;
    debug!(id, lead_id = feedback.lead_id, "Inserted feedback");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn generator(seed: u64) -> SeedGenerator<StdRng> {
        let now = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        SeedGenerator::new(StdRng::seed_from_u64(seed), SeedConfig::default())
            .unwrap()
            .with_now(now)
    }

    #[test]
    fn counts_fall_in_configured_ranges() {
        let mut seeder = generator(1);
        for _ in 0..50 {
            assert!((5..=8).contains(&seeder.agent_count()));
            assert!((20..=30).contains(&seeder.lead_count()));
            assert!((10..=15).contains(&seeder.feedback_count()));
        }
    }

    #[test]
    fn generated_foreign_keys_reference_generated_parents() {
        let mut seeder = generator(7);

        // ids as the database would hand them back
        let agent_ids: Vec<i32> = (1..=seeder.agent_count() as i32).collect();
        let leads: Vec<(i32, NewLead)> = (0..seeder.lead_count())
            .map(|i| (100 + i as i32, seeder.lead(&agent_ids)))
            .collect();
        let lead_ids: Vec<i32> = leads.iter().map(|(id, _)| *id).collect();

        for (_, lead) in &leads {
            if let Some(agent) = lead.assigned_agent_id {
                assert!(agent_ids.contains(&agent));
            }
        }

        for _ in 0..seeder.feedback_count() {
            let feedback = seeder.feedback(&lead_ids, &agent_ids).unwrap();
            assert!(lead_ids.contains(&feedback.lead_id));
            assert!(agent_ids.contains(&feedback.agent_id));
            assert!((1..=5).contains(&feedback.rating));
            assert!(!feedback.comments.is_empty());
        }
    }

    #[test]
    fn feedback_needs_leads_and_agents() {
        let mut seeder = generator(3);
        assert_eq!(seeder.feedback(&[], &[1, 2]), None);
        assert_eq!(seeder.feedback(&[1, 2], &[]), None);
    }

    #[test]
    fn leads_stay_unassigned_without_agents() {
        let mut seeder = generator(11);
        for _ in 0..50 {
            assert_eq!(seeder.lead(&[]).assigned_agent_id, None);
        }
    }

    #[test]
    fn assignment_rate_tracks_probability() {
        let mut seeder = generator(42);
        let agents = [1, 2, 3];
        let assigned = (0..2000)
            .filter(|_| seeder.lead(&agents).assigned_agent_id.is_some())
            .count();
        let rate = assigned as f64 / 2000.0;
        assert!((0.64..=0.76).contains(&rate), "assignment rate {rate}");
    }

    #[test]
    fn timestamps_fall_inside_windows() {
        let mut seeder = generator(5);
        let now = seeder.now;
        for _ in 0..100 {
            let lead = seeder.lead(&[1]);
            assert!(lead.created_at <= now);
            assert!(lead.created_at >= now - TimeDelta::days(180));

            let feedback = seeder.feedback(&[1], &[1]).unwrap();
            assert!(feedback.submitted_at <= now);
            assert!(feedback.submitted_at >= now - TimeDelta::days(90));
        }
    }

    #[test]
    fn emails_are_unique_across_agents_and_leads() {
        let mut seeder = generator(9);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            assert!(seen.insert(seeder.agent().email));
            assert!(seen.insert(seeder.lead(&[]).email));
        }
    }

    #[test]
    fn statuses_come_from_the_enumeration() {
        let mut seeder = generator(13);
        let seen: HashSet<LeadStatus> = (0..200).map(|_| seeder.lead(&[]).status).collect();
        assert_eq!(seen.len(), LeadStatus::ALL.len());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SeedConfig {
            assign_probability: 1.5,
            ..SeedConfig::default()
        };
        assert!(SeedGenerator::new(StdRng::seed_from_u64(0), config).is_err());

        #[allow(clippy::reversed_empty_ranges)]
        let config = SeedConfig {
            agents: 8..=5,
            ..SeedConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
