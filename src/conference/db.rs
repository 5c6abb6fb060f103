use std::collections::HashMap;

use sqlx::{
    migrate::MigrateDatabase,
    prelude::FromRow,
    query,
    sqlite::{Sqlite, SqlitePoolOptions},
    types::{time::OffsetDateTime, Json},
    SqlitePool,
};
use tokio::sync::Mutex;

use crate::{
    conference::{
        about::{About, AboutUpdate, AboutUploads, ScheduleEntry, Sponsor},
        admin::{Admin, AdminInput},
        coordinator::{Coordinator, CoordinatorInput},
        event::{Event, EventInput, EventSummary},
        guest::{Guest, GuestInput},
        participant::{generate_registration_id, Participant, ParticipantInput},
    },
    error::ApiError,
};

/// Primary key of the about page row
const ABOUT_ID: i64 = 1;

fn not_found(kind: &str) -> anyhow::Error {
    ApiError::NotFound(kind.to_owned()).into()
}

#[derive(FromRow)]
struct AboutRow {
    poster: String,
    description: String,
    gallery: Json<Vec<String>>,
    schedule: Json<Vec<ScheduleEntry>>,
    sponsors: Json<Vec<Sponsor>>,
}

impl From<AboutRow> for About {
    fn from(row: AboutRow) -> Self {
        About {
            poster: row.poster,
            description: row.description,
            gallery: row.gallery.0,
            schedule: row.schedule.0,
            sponsors: row.sponsors.0,
        }
    }
}

pub struct ConferenceDb {
    db: SqlitePool,

    /// Serializes read-modify-write cycles on the about row
    about_lock: Mutex<()>,
}

impl ConferenceDb {
    /// Open (creating if necessary) the database at `url` and ensure the schema exists.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        if !Sqlite::database_exists(url).await? {
            log::info!("Creating database {}", url);
            Sqlite::create_database(url).await?;
        }

        let db = SqlitePool::connect(url).await?;
        Self::with_pool(db).await
    }

    /// A private database living only as long as this value.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(db).await
    }

    async fn with_pool(db: SqlitePool) -> anyhow::Result<Self> {
        query(
            "create table if not exists events(
                        id integer primary key autoincrement,
                        name text not null,
                        description text,
                        image text,
                        date text,
                        venue text,
                        created_at text not null
                    );",
        )
        .execute(&db)
        .await?;

        query(
            "create table if not exists participants(
                        id integer primary key autoincrement,
                        name text not null,
                        email text not null unique collate nocase,
                        phone text,
                        college text,
                        department text,
                        year text,
                        social_link text,
                        accommodation_status text not null default 'pending'
                            check(accommodation_status in ('pending', 'confirmed', 'rejected')),
                        travel_status text not null default 'pending'
                            check(travel_status in ('pending', 'confirmed', 'rejected')),
                        registration_id text not null unique,
                        created_at text not null
                    );",
        )
        .execute(&db)
        .await?;

        query(
            "create table if not exists participant_events(
                        participant integer not null,
                        event integer not null,
                        position integer not null,
                        primary key(participant, event),
                        foreign key(participant) references participants(id) on delete cascade,
                        foreign key(event) references events(id) on delete cascade
                    );",
        )
        .execute(&db)
        .await?;

        query(
            "create table if not exists guests(
                        id integer primary key autoincrement,
                        name text not null,
                        designation text,
                        description text,
                        contact text,
                        image text,
                        created_at text not null
                    );",
        )
        .execute(&db)
        .await?;

        query(
            "create table if not exists coordinators(
                        id integer primary key autoincrement,
                        name text not null,
                        designation text,
                        contact text,
                        image text,
                        created_at text not null
                    );",
        )
        .execute(&db)
        .await?;

        query(
            "create table if not exists admins(
                        id integer primary key autoincrement,
                        name text not null,
                        email text not null unique collate nocase,
                        created_at text not null
                    );",
        )
        .execute(&db)
        .await?;

        query(
            "create table if not exists about(
                        id integer primary key check(id = 1),
                        poster text not null,
                        description text not null,
                        gallery text not null,
                        schedule text not null,
                        sponsors text not null
                    );",
        )
        .execute(&db)
        .await?;

        Ok(ConferenceDb {
            db,
            about_lock: Mutex::new(()),
        })
    }

    pub async fn get_events(&self) -> anyhow::Result<Vec<Event>> {
        Ok(sqlx::query_as("select * from events order by id")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn get_event(&self, id: i64) -> anyhow::Result<Event> {
        sqlx::query_as("select * from events where id = ? limit 1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_found("Event"))
    }

    pub async fn add_event(&self, event: &EventInput, image: Option<&str>) -> anyhow::Result<Event> {
        log::debug!("Creating event {}", event.name);
        let id = sqlx::query(
            "insert into events(name, description, image, date, venue, created_at)
                        values(?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.name)
        .bind(&event.description)
        .bind(image)
        .bind(&event.date)
        .bind(&event.venue)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        self.get_event(id).await
    }

    /// Replace an event's fields. The image is only replaced when `image` is set.
    pub async fn update_event(
        &self,
        id: i64,
        event: &EventInput,
        image: Option<&str>,
    ) -> anyhow::Result<Event> {
        log::debug!("Updating event {}", id);
        let updated = sqlx::query(
            "update events set
                        name = ?, description = ?, image = coalesce(?, image), date = ?, venue = ?
                        where id = ?",
        )
        .bind(&event.name)
        .bind(&event.description)
        .bind(image)
        .bind(&event.date)
        .bind(&event.venue)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(not_found("Event"));
        }
        self.get_event(id).await
    }

    pub async fn delete_event(&self, id: i64) -> anyhow::Result<()> {
        log::debug!("Deleting event {}", id);
        let deleted = sqlx::query("delete from events where id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found("Event"));
        }
        Ok(())
    }

    /// Attach populated event summaries to each participant.
    async fn load_participant_events(
        &self,
        mut participants: Vec<Participant>,
    ) -> anyhow::Result<Vec<Participant>> {
        let links: Vec<(i64, i64, String)> = sqlx::query_as(
            "select pe.participant, e.id, e.name
                        from participant_events pe
                        inner join events e on e.id = pe.event
                        order by pe.participant, pe.position",
        )
        .fetch_all(&self.db)
        .await?;

        let mut by_participant: HashMap<i64, Vec<EventSummary>> = HashMap::new();
        for (participant, id, name) in links {
            by_participant
                .entry(participant)
                .or_default()
                .push(EventSummary { id, name });
        }

        for participant in participants.iter_mut() {
            participant.events = by_participant.remove(&participant.id).unwrap_or_default();
        }

        Ok(participants)
    }

    pub async fn get_participants(&self) -> anyhow::Result<Vec<Participant>> {
        let participants = sqlx::query_as("select * from participants order by id")
            .fetch_all(&self.db)
            .await?;
        self.load_participant_events(participants).await
    }

    pub async fn get_participant(&self, id: i64) -> anyhow::Result<Participant> {
        let mut participant: Participant =
            sqlx::query_as("select * from participants where id = ? limit 1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| not_found("Participant"))?;

        participant.events = sqlx::query_as(
            "select e.id, e.name
                        from events e
                        inner join participant_events pe on e.id = pe.event
                        where pe.participant = ?
                        order by pe.position",
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(participant)
    }

    pub async fn get_participants_for_event(&self, event_id: i64) -> anyhow::Result<Vec<Participant>> {
        self.get_event(event_id).await?;

        let participants = sqlx::query_as(
            "select p.* from participants p
                        inner join participant_events pe on p.id = pe.participant
                        where pe.event = ?
                        order by p.id",
        )
        .bind(event_id)
        .fetch_all(&self.db)
        .await?;
        self.load_participant_events(participants).await
    }

    /// Check the unique participant columns, ignoring the participant being replaced.
    async fn check_participant_unique(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        participant: &ParticipantInput,
        registration_id: Option<&str>,
        exclude: Option<i64>,
    ) -> anyhow::Result<()> {
        let email_taken: bool = sqlx::query_scalar(
            "select exists(select 1 from participants where email = ? collate nocase and id != ?)",
        )
        .bind(participant.email.trim())
        .bind(exclude.unwrap_or(-1))
        .fetch_one(&mut **tx)
        .await?;
        if email_taken {
            return Err(ApiError::Duplicate(format!(
                "email {} is already registered",
                participant.email.trim()
            ))
            .into());
        }

        if let Some(registration_id) = registration_id {
            let reg_taken: bool = sqlx::query_scalar(
                "select exists(select 1 from participants where registration_id = ? and id != ?)",
            )
            .bind(registration_id)
            .bind(exclude.unwrap_or(-1))
            .fetch_one(&mut **tx)
            .await?;
            if reg_taken {
                return Err(ApiError::Duplicate(format!(
                    "registration id {} is already in use",
                    registration_id
                ))
                .into());
            }
        }

        Ok(())
    }

    async fn replace_participant_events(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        participant_id: i64,
        events: &[i64],
    ) -> anyhow::Result<()> {
        sqlx::query("delete from participant_events where participant = ?")
            .bind(participant_id)
            .execute(&mut **tx)
            .await?;

        for (i, event) in events.iter().enumerate() {
            let exists: bool = sqlx::query_scalar("select exists(select 1 from events where id = ?)")
                .bind(event)
                .fetch_one(&mut **tx)
                .await?;
            if !exists {
                return Err(ApiError::UnknownReference(format!("event {}", event)).into());
            }

            sqlx::query(
                "insert into participant_events(participant, event, position) values(?, ?, ?)",
            )
            .bind(participant_id)
            .bind(event)
            .bind(i as i64)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    pub async fn add_participant(&self, participant: &ParticipantInput) -> anyhow::Result<Participant> {
        log::debug!("Registering participant {}", participant.email);
        let registration_id = participant
            .registration_id
            .as_deref()
            .map(|r| r.trim().to_owned())
            .unwrap_or_else(generate_registration_id);

        let mut tx = self.db.begin().await?;
        Self::check_participant_unique(&mut tx, participant, Some(&registration_id), None).await?;

        let id = sqlx::query(
            "insert into participants(
                        name, email, phone, college, department, year, social_link,
                        accommodation_status, travel_status, registration_id, created_at
                    ) values(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(participant.name.trim())
        .bind(participant.email.trim())
        .bind(&participant.phone)
        .bind(&participant.college)
        .bind(&participant.department)
        .bind(&participant.year)
        .bind(&participant.social_link)
        .bind(participant.accommodation_status)
        .bind(participant.travel_status)
        .bind(&registration_id)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        Self::replace_participant_events(&mut tx, id, &participant.event_ids()).await?;
        tx.commit().await?;

        self.get_participant(id).await
    }

    /// Replace every field of a participant, including its event list.
    ///
    /// An omitted registration id keeps the stored one.
    pub async fn update_participant(
        &self,
        id: i64,
        participant: &ParticipantInput,
    ) -> anyhow::Result<Participant> {
        log::debug!("Updating participant {}", id);
        let registration_id = participant.registration_id.as_deref().map(str::trim);

        let mut tx = self.db.begin().await?;
        Self::check_participant_unique(&mut tx, participant, registration_id, Some(id)).await?;

        let updated = sqlx::query(
            "update participants set
                        name = ?, email = ?, phone = ?, college = ?, department = ?, year = ?,
                        social_link = ?, accommodation_status = ?, travel_status = ?,
                        registration_id = coalesce(?, registration_id)
                        where id = ?",
        )
        .bind(participant.name.trim())
        .bind(participant.email.trim())
        .bind(&participant.phone)
        .bind(&participant.college)
        .bind(&participant.department)
        .bind(&participant.year)
        .bind(&participant.social_link)
        .bind(participant.accommodation_status)
        .bind(participant.travel_status)
        .bind(registration_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(not_found("Participant"));
        }

        Self::replace_participant_events(&mut tx, id, &participant.event_ids()).await?;
        tx.commit().await?;

        self.get_participant(id).await
    }

    pub async fn delete_participant(&self, id: i64) -> anyhow::Result<()> {
        log::debug!("Deleting participant {}", id);
        let deleted = sqlx::query("delete from participants where id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found("Participant"));
        }
        Ok(())
    }

    pub async fn get_guests(&self) -> anyhow::Result<Vec<Guest>> {
        Ok(sqlx::query_as("select * from guests order by id")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn get_guest(&self, id: i64) -> anyhow::Result<Guest> {
        sqlx::query_as("select * from guests where id = ? limit 1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_found("Guest"))
    }

    pub async fn add_guest(&self, guest: &GuestInput, image: Option<&str>) -> anyhow::Result<Guest> {
        log::debug!("Creating guest {}", guest.name);
        let id = sqlx::query(
            "insert into guests(name, designation, description, contact, image, created_at)
                        values(?, ?, ?, ?, ?, ?)",
        )
        .bind(&guest.name)
        .bind(&guest.designation)
        .bind(&guest.description)
        .bind(&guest.contact)
        .bind(image)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        self.get_guest(id).await
    }

    pub async fn update_guest(
        &self,
        id: i64,
        guest: &GuestInput,
        image: Option<&str>,
    ) -> anyhow::Result<Guest> {
        log::debug!("Updating guest {}", id);
        let updated = sqlx::query(
            "update guests set
                        name = ?, designation = ?, description = ?, contact = ?,
                        image = coalesce(?, image)
                        where id = ?",
        )
        .bind(&guest.name)
        .bind(&guest.designation)
        .bind(&guest.description)
        .bind(&guest.contact)
        .bind(image)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(not_found("Guest"));
        }
        self.get_guest(id).await
    }

    pub async fn delete_guest(&self, id: i64) -> anyhow::Result<()> {
        log::debug!("Deleting guest {}", id);
        let deleted = sqlx::query("delete from guests where id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found("Guest"));
        }
        Ok(())
    }

    pub async fn get_coordinators(&self) -> anyhow::Result<Vec<Coordinator>> {
        Ok(sqlx::query_as("select * from coordinators order by id")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn get_coordinator(&self, id: i64) -> anyhow::Result<Coordinator> {
        sqlx::query_as("select * from coordinators where id = ? limit 1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_found("Coordinator"))
    }

    pub async fn add_coordinator(
        &self,
        coordinator: &CoordinatorInput,
        image: Option<&str>,
    ) -> anyhow::Result<Coordinator> {
        log::debug!("Creating coordinator {}", coordinator.name);
        let id = sqlx::query(
            "insert into coordinators(name, designation, contact, image, created_at)
                        values(?, ?, ?, ?, ?)",
        )
        .bind(&coordinator.name)
        .bind(&coordinator.designation)
        .bind(&coordinator.contact)
        .bind(image)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        self.get_coordinator(id).await
    }

    pub async fn update_coordinator(
        &self,
        id: i64,
        coordinator: &CoordinatorInput,
        image: Option<&str>,
    ) -> anyhow::Result<Coordinator> {
        log::debug!("Updating coordinator {}", id);
        let updated = sqlx::query(
            "update coordinators set
                        name = ?, designation = ?, contact = ?, image = coalesce(?, image)
                        where id = ?",
        )
        .bind(&coordinator.name)
        .bind(&coordinator.designation)
        .bind(&coordinator.contact)
        .bind(image)
        .bind(id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(not_found("Coordinator"));
        }
        self.get_coordinator(id).await
    }

    pub async fn delete_coordinator(&self, id: i64) -> anyhow::Result<()> {
        log::debug!("Deleting coordinator {}", id);
        let deleted = sqlx::query("delete from coordinators where id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found("Coordinator"));
        }
        Ok(())
    }

    pub async fn get_admins(&self) -> anyhow::Result<Vec<Admin>> {
        Ok(sqlx::query_as("select * from admins order by id")
            .fetch_all(&self.db)
            .await?)
    }

    pub async fn get_admin(&self, id: i64) -> anyhow::Result<Admin> {
        sqlx::query_as("select * from admins where id = ? limit 1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| not_found("Admin"))
    }

    pub async fn add_admin(&self, admin: &AdminInput) -> anyhow::Result<Admin> {
        log::debug!("Creating admin {}", admin.email);
        let id = sqlx::query("insert into admins(name, email, created_at) values(?, ?, ?)")
            .bind(admin.name.trim())
            .bind(admin.email.trim())
            .bind(OffsetDateTime::now_utc())
            .execute(&self.db)
            .await?
            .last_insert_rowid();

        self.get_admin(id).await
    }

    pub async fn update_admin(&self, id: i64, admin: &AdminInput) -> anyhow::Result<Admin> {
        log::debug!("Updating admin {}", id);
        let updated = sqlx::query("update admins set name = ?, email = ? where id = ?")
            .bind(admin.name.trim())
            .bind(admin.email.trim())
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(not_found("Admin"));
        }
        self.get_admin(id).await
    }

    pub async fn delete_admin(&self, id: i64) -> anyhow::Result<()> {
        log::debug!("Deleting admin {}", id);
        let deleted = sqlx::query("delete from admins where id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();

        if deleted == 0 {
            return Err(not_found("Admin"));
        }
        Ok(())
    }

    /// Return the about page, creating the empty default on first use.
    pub async fn get_or_create_about(&self) -> anyhow::Result<About> {
        if let Some(about) = self.get_about().await? {
            return Ok(about);
        }

        let created = sqlx::query(
            "insert or ignore into about(id, poster, description, gallery, schedule, sponsors)
                        values(?, '', '', '[]', '[]', '[]')",
        )
        .bind(ABOUT_ID)
        .execute(&self.db)
        .await?
        .rows_affected();

        if created > 0 {
            log::info!("Created default about page");
        }

        self.get_about().await?.ok_or_else(|| not_found("About"))
    }

    async fn get_about(&self) -> anyhow::Result<Option<About>> {
        let row: Option<AboutRow> = sqlx::query_as("select * from about where id = ?")
            .bind(ABOUT_ID)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.map(About::from))
    }

    async fn save_about(&self, about: &About) -> anyhow::Result<()> {
        sqlx::query(
            "update about set
                        poster = ?, description = ?, gallery = ?, schedule = ?, sponsors = ?
                        where id = ?",
        )
        .bind(&about.poster)
        .bind(&about.description)
        .bind(Json(&about.gallery))
        .bind(Json(&about.schedule))
        .bind(Json(&about.sponsors))
        .bind(ABOUT_ID)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn close(&self) {
        self.db.close().await;
    }

    /// Merge an update into the about page and persist it.
    pub async fn update_about(
        &self,
        update: AboutUpdate,
        uploads: AboutUploads,
    ) -> anyhow::Result<About> {
        let _guard = self.about_lock.lock().await;

        let mut about = self.get_or_create_about().await?;
        about.apply_update(update, uploads);
        self.save_about(&about).await?;

        Ok(about)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::conference::{about::SponsorInput, participant::ApprovalStatus};

    fn participant(name: &str, email: &str) -> ParticipantInput {
        ParticipantInput {
            name: name.to_owned(),
            email: email.to_owned(),
            ..Default::default()
        }
    }

    fn event(name: &str) -> EventInput {
        EventInput {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_about_singleton() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let first = db.get_or_create_about().await.unwrap();
        assert_eq!(first, About::default());

        let second = db.get_or_create_about().await.unwrap();
        assert_eq!(first, second);

        let rows: i64 = sqlx::query_scalar("select count(*) from about")
            .fetch_one(&db.db)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_about_update_persists() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let update = AboutUpdate {
            description: Some("Welcome".to_owned()),
            schedule: vec![ScheduleEntry {
                date: "2026-01-18".to_owned(),
                event: "Opening".to_owned(),
                time: "10:00".to_owned(),
            }],
            sponsors: vec![SponsorInput {
                name: "Acme".to_owned(),
                ..Default::default()
            }],
        };
        let uploads = AboutUploads {
            poster: Some("/uploads/about/poster.png".to_owned()),
            gallery: vec!["/uploads/about/g1.png".to_owned()],
            sponsor_logos: vec![(0, "/uploads/about/acme.png".to_owned())],
        };

        let updated = db.update_about(update, uploads).await.unwrap();
        let stored = db.get_or_create_about().await.unwrap();
        assert_eq!(updated, stored);
        assert_eq!(stored.description, "Welcome");
        assert_eq!(stored.schedule.len(), 1);
        assert_eq!(stored.sponsors[0].logo, "/uploads/about/acme.png");

        let again = db
            .update_about(
                AboutUpdate::default(),
                AboutUploads {
                    gallery: vec!["/uploads/about/g2.png".to_owned()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(again.gallery, vec!["/uploads/about/g1.png", "/uploads/about/g2.png"]);
        assert_eq!(again.poster, "/uploads/about/poster.png");
        assert!(again.schedule.is_empty());
    }

    #[tokio::test]
    async fn test_about_read_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("about.db").display());
        let db = ConferenceDb::connect(&url).await.unwrap();
        let created = db.get_or_create_about().await.unwrap();

        // Reading must not wait on another connection's write lock.
        let mut tx = db.db.begin().await.unwrap();
        sqlx::query("insert into events(name, created_at) values('Keynote', '')")
            .execute(&mut *tx)
            .await
            .unwrap();

        let read = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            db.get_or_create_about(),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(read, created);

        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_about_updates() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("about.db").display());
        let db = Arc::new(ConferenceDb::connect(&url).await.unwrap());

        let updates = (0..20).map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.update_about(
                    AboutUpdate::default(),
                    AboutUploads {
                        gallery: vec![format!("/uploads/about/g{}.png", i)],
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            })
        });
        for update in updates.collect::<Vec<_>>() {
            update.await.unwrap();
        }

        let about = db.get_or_create_about().await.unwrap();
        assert_eq!(about.gallery.len(), 20);
        for i in 0..20 {
            assert!(about.gallery.contains(&format!("/uploads/about/g{}.png", i)));
        }
    }

    #[tokio::test]
    async fn test_about_update_fails_on_closed_pool() {
        let db = ConferenceDb::in_memory().await.unwrap();
        db.close().await;

        let result = db
            .update_about(AboutUpdate::default(), AboutUploads::default())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_participant_unique_email() {
        let db = ConferenceDb::in_memory().await.unwrap();

        db.add_participant(&participant("Asha", "asha@example.com"))
            .await
            .unwrap();

        let err = db
            .add_participant(&participant("Other Asha", "ASHA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_participant_unique_registration_id() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let mut first = participant("Asha", "asha@example.com");
        first.registration_id = Some("GV-0001".to_owned());
        db.add_participant(&first).await.unwrap();

        let mut second = participant("Ravi", "ravi@example.com");
        second.registration_id = Some("GV-0001".to_owned());
        let err = db.add_participant(&second).await.unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Duplicate(_)));

        assert_eq!(db.get_participants().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_participant_generated_registration_id() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let a = db.add_participant(&participant("A", "a@example.com")).await.unwrap();
        let b = db.add_participant(&participant("B", "b@example.com")).await.unwrap();
        assert!(a.registration_id.starts_with("GV-"));
        assert_ne!(a.registration_id, b.registration_id);
        assert_eq!(a.accommodation_status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn test_participant_events() {
        let db = ConferenceDb::in_memory().await.unwrap();
        let hackathon = db.add_event(&event("Hackathon"), None).await.unwrap();
        let quiz = db.add_event(&event("Quiz"), None).await.unwrap();

        let mut input = participant("Asha", "asha@example.com");
        input.events = vec![quiz.id, hackathon.id];
        let created = db.add_participant(&input).await.unwrap();
        assert_eq!(
            created.events,
            vec![
                EventSummary { id: quiz.id, name: "Quiz".to_owned() },
                EventSummary { id: hackathon.id, name: "Hackathon".to_owned() },
            ]
        );

        input.events = vec![hackathon.id];
        input.travel_status = ApprovalStatus::Rejected;
        let updated = db.update_participant(created.id, &input).await.unwrap();
        assert_eq!(updated.events.len(), 1);
        assert_eq!(updated.travel_status, ApprovalStatus::Rejected);
        assert_eq!(updated.registration_id, created.registration_id);

        let registered = db.get_participants_for_event(hackathon.id).await.unwrap();
        assert_eq!(registered.len(), 1);
        assert!(db.get_participants_for_event(quiz.id).await.unwrap().is_empty());

        db.delete_event(hackathon.id).await.unwrap();
        let after = db.get_participant(created.id).await.unwrap();
        assert!(after.events.is_empty());
    }

    #[tokio::test]
    async fn test_participant_unknown_event() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let mut input = participant("Asha", "asha@example.com");
        input.events = vec![42];
        let err = db.add_participant(&input).await.unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::UnknownReference(_)));
        assert!(db.get_participants().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_participant_update_keeps_own_email() {
        let db = ConferenceDb::in_memory().await.unwrap();
        let created = db.add_participant(&participant("Asha", "asha@example.com")).await.unwrap();
        db.add_participant(&participant("Ravi", "ravi@example.com")).await.unwrap();

        let mut input = participant("Asha K", "asha@example.com");
        input.accommodation_status = ApprovalStatus::Confirmed;
        let updated = db.update_participant(created.id, &input).await.unwrap();
        assert_eq!(updated.name, "Asha K");
        assert_eq!(updated.accommodation_status, ApprovalStatus::Confirmed);

        let err = db
            .update_participant(created.id, &participant("Asha", "ravi@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_missing_records() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let err = db.get_participant(7).await.unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));

        let err = db.delete_guest(7).await.unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));

        let err = db
            .update_participant(7, &participant("Asha", "asha@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_image_kept_without_upload() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let guest = GuestInput {
            name: "Dr. Rao".to_owned(),
            designation: Some("Keynote".to_owned()),
            ..Default::default()
        };
        let created = db
            .add_guest(&guest, Some("/uploads/guests/rao.png"))
            .await
            .unwrap();

        let renamed = GuestInput {
            name: "Dr. K. Rao".to_owned(),
            ..guest
        };
        let updated = db.update_guest(created.id, &renamed, None).await.unwrap();
        assert_eq!(updated.name, "Dr. K. Rao");
        assert_eq!(updated.image.as_deref(), Some("/uploads/guests/rao.png"));
        assert_eq!(updated.designation, None);

        let coordinator = CoordinatorInput {
            name: "Meera".to_owned(),
            ..Default::default()
        };
        let created = db.add_coordinator(&coordinator, None).await.unwrap();
        let updated = db
            .update_coordinator(created.id, &coordinator, Some("/uploads/coordinators/meera.png"))
            .await
            .unwrap();
        assert_eq!(updated.image.as_deref(), Some("/uploads/coordinators/meera.png"));
    }

    #[tokio::test]
    async fn test_admin_crud() {
        let db = ConferenceDb::in_memory().await.unwrap();

        let admin = AdminInput {
            name: "Root".to_owned(),
            email: "root@example.com".to_owned(),
        };
        let created = db.add_admin(&admin).await.unwrap();
        assert!(db.add_admin(&admin).await.is_err());

        let updated = db
            .update_admin(
                created.id,
                &AdminInput {
                    name: "Organiser".to_owned(),
                    ..admin
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Organiser");

        db.delete_admin(created.id).await.unwrap();
        assert!(db.get_admins().await.unwrap().is_empty());
    }
}
