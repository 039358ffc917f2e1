use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::bids::{self, BidCheck};
use crate::models::category::Category;
use crate::models::notification::{NewNotification, Notification};
use crate::models::task::{NewTask, Task, TaskPatch};
use crate::models::user::{Profile, UserRow};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

/// Insert payload for a new account.
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub password_salt: String,
}

/// Optional filters for task listing.
#[derive(Default)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub category_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

/// Result of a bid-submit transaction.
pub enum BidOutcome {
    Created(Notification),
    OwnTask,
    Duplicate,
    TaskClosed,
}

/// Result of an assign/decline transaction.
pub enum BidDecision {
    /// The task_update notification written to the worker.
    Done(Notification),
    BidNotFound,
    TaskClosed,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- User Operations --

    /// Insert a user. Returns None when the email is already taken.
    pub async fn create_user(&self, user: &NewUser) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"INSERT INTO users (email, display_name, role, password_hash, password_salt)
               VALUES (LOWER($1), $2, $3, $4, $5)
               ON CONFLICT (email) DO NOTHING
               RETURNING id, email, display_name, role, password_hash, password_salt, is_active, created_at"#,
        )
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.role)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, role, password_hash, password_salt, is_active, created_at FROM users WHERE email = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<UserRow>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, role, password_hash, password_salt, is_active, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_password(&self, id: Uuid, hash: &str, salt: &str) -> anyhow::Result<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, password_salt = $3 WHERE id = $1")
                .bind(id)
                .bind(hash)
                .bind(salt)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_users(&self) -> anyhow::Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, role, created_at FROM users WHERE is_active = true ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn deactivate_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Category Operations --

    pub async fn list_categories(&self) -> anyhow::Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, created_at FROM categories ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a category. Returns None when the slug already exists.
    pub async fn insert_category(&self, name: &str, slug: &str) -> anyhow::Result<Option<Category>> {
        let row = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, slug) VALUES ($1, $2)
               ON CONFLICT (slug) DO NOTHING
               RETURNING id, name, slug, created_at"#,
        )
        .bind(name)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // -- Task Operations --

    /// Create a task and write one `new_task` notification per active worker
    /// in the same transaction. Returns the task together with the inserted
    /// rows so the caller can fan them out after commit.
    pub async fn create_task(
        &self,
        owner_id: Uuid,
        owner_name: &str,
        task: &NewTask,
    ) -> anyhow::Result<(Task, Vec<Notification>)> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Task>(
            r#"INSERT INTO tasks (owner_id, category_id, title, description, budget)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, owner_id, category_id, title, description, budget, status, assigned_to, created_at, updated_at"#,
        )
        .bind(owner_id)
        .bind(task.category_id)
        .bind(&task.title)
        .bind(task.description.as_deref().unwrap_or(""))
        .bind(task.budget)
        .fetch_one(&mut *tx)
        .await?;

        let announcements = sqlx::query_as::<_, Notification>(
            r#"INSERT INTO notifications (kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body)
               SELECT 'new_task', $1, $2, u.id, u.display_name, $3, $4
               FROM users u
               WHERE u.role = 'worker' AND u.is_active = true AND u.id <> $1
               RETURNING id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at"#,
        )
        .bind(owner_id)
        .bind(owner_name)
        .bind(created.id)
        .bind(format!("New task posted: {}", created.title))
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created, announcements))
    }

    pub async fn list_tasks(&self, filter: &TaskFilter) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, Task>(
            r#"SELECT id, owner_id, category_id, title, description, budget, status, assigned_to, created_at, updated_at
               FROM tasks
               WHERE ($1::text IS NULL OR status = $1)
                 AND ($2::uuid IS NULL OR category_id = $2)
                 AND ($3::uuid IS NULL OR owner_id = $3)
               ORDER BY created_at DESC
               LIMIT $4 OFFSET $5"#,
        )
        .bind(&filter.status)
        .bind(filter.category_id)
        .bind(filter.owner_id)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get_task(&self, id: Uuid) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            "SELECT id, owner_id, category_id, title, description, budget, status, assigned_to, created_at, updated_at FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn update_task(&self, id: Uuid, patch: &TaskPatch) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query_as::<_, Task>(
            r#"UPDATE tasks SET
                   title = COALESCE($2, title),
                   description = COALESCE($3, description),
                   budget = COALESCE($4, budget),
                   category_id = COALESCE($5, category_id),
                   status = COALESCE($6, status),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, owner_id, category_id, title, description, budget, status, assigned_to, created_at, updated_at"#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.budget)
        .bind(patch.category_id)
        .bind(&patch.status)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Delete only while still open. Notifications cascade.
    pub async fn delete_open_task(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND status = 'open'")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Notification Operations --

    /// Append-only insert. Participant names are denormalized at write time;
    /// `created_at` and the read flag are server-assigned.
    pub async fn insert_notification(&self, n: &NewNotification) -> anyhow::Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"INSERT INTO notifications (kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount)
               VALUES (
                   $1, $2,
                   (SELECT display_name FROM users WHERE id = $2),
                   $3,
                   (SELECT display_name FROM users WHERE id = $3),
                   $4, $5, $6
               )
               RETURNING id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at"#,
        )
        .bind(n.kind.as_str())
        .bind(n.sender_id)
        .bind(n.recipient_id)
        .bind(n.task_id)
        .bind(&n.body)
        .bind(n.bid_amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Submit a bid: one transaction that re-checks the task is open, rejects
    /// a second live bid from the same worker, and writes the bid
    /// notification to the owner.
    pub async fn create_bid(
        &self,
        task_id: Uuid,
        worker_id: Uuid,
        amount: Decimal,
        note: &str,
    ) -> anyhow::Result<BidOutcome> {
        let mut tx = self.pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(
            "SELECT id, owner_id, category_id, title, description, budget, status, assigned_to, created_at, updated_at FROM tasks WHERE id = $1 FOR UPDATE",
        )
        .bind(task_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(task) = task else {
            return Ok(BidOutcome::TaskClosed);
        };

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE task_id = $1 AND sender_id = $2 AND kind = 'bid')",
        )
        .bind(task_id)
        .bind(worker_id)
        .fetch_one(&mut *tx)
        .await?;

        match bids::check_bid(&task, worker_id, already) {
            BidCheck::Allowed => {}
            BidCheck::OwnTask => return Ok(BidOutcome::OwnTask),
            BidCheck::TaskClosed => return Ok(BidOutcome::TaskClosed),
            BidCheck::Duplicate => return Ok(BidOutcome::Duplicate),
        }

        let bid = sqlx::query_as::<_, Notification>(
            r#"INSERT INTO notifications (kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount)
               VALUES (
                   'bid', $1,
                   (SELECT display_name FROM users WHERE id = $1),
                   $2,
                   (SELECT display_name FROM users WHERE id = $2),
                   $3, $4, $5
               )
               RETURNING id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at"#,
        )
        .bind(worker_id)
        .bind(task.owner_id)
        .bind(task_id)
        .bind(note)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BidOutcome::Created(bid))
    }

    /// Accept a bid: assign the task, delete the originating bid
    /// notification, and notify the worker — atomically.
    pub async fn assign_task(
        &self,
        task_id: Uuid,
        bid_id: Uuid,
        owner_id: Uuid,
    ) -> anyhow::Result<BidDecision> {
        let mut tx = self.pool.begin().await?;

        let bid = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications
               WHERE id = $1
               FOR UPDATE"#,
        )
        .bind(bid_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(bid) = bid else {
            return Ok(BidDecision::BidNotFound);
        };
        if !bids::bid_matches(&bid, task_id, owner_id) {
            return Ok(BidDecision::BidNotFound);
        }

        let updated = sqlx::query(
            "UPDATE tasks SET status = 'assigned', assigned_to = $2, updated_at = NOW() WHERE id = $1 AND status = 'open'",
        )
        .bind(task_id)
        .bind(bid.sender_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(BidDecision::TaskClosed);
        }

        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(bid_id)
            .execute(&mut *tx)
            .await?;

        let plan = bids::acceptance_notice(owner_id, &bid, task_id);
        let notice = sqlx::query_as::<_, Notification>(
            r#"INSERT INTO notifications (kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body)
               VALUES (
                   $1, $2,
                   (SELECT display_name FROM users WHERE id = $2),
                   $3,
                   (SELECT display_name FROM users WHERE id = $3),
                   $4, $5
               )
               RETURNING id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at"#,
        )
        .bind(plan.kind.as_str())
        .bind(plan.sender_id)
        .bind(plan.recipient_id)
        .bind(plan.task_id)
        .bind(&plan.body)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BidDecision::Done(notice))
    }

    /// Decline a bid: delete the originating bid notification and notify the
    /// worker, atomically. The task stays open.
    pub async fn decline_bid(
        &self,
        task_id: Uuid,
        bid_id: Uuid,
        owner_id: Uuid,
    ) -> anyhow::Result<BidDecision> {
        let mut tx = self.pool.begin().await?;

        let bid = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications
               WHERE id = $1
               FOR UPDATE"#,
        )
        .bind(bid_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(bid) = bid else {
            return Ok(BidDecision::BidNotFound);
        };
        if !bids::bid_matches(&bid, task_id, owner_id) {
            return Ok(BidDecision::BidNotFound);
        }

        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(bid_id)
            .execute(&mut *tx)
            .await?;

        let plan = bids::decline_notice(owner_id, &bid, task_id);
        let notice = sqlx::query_as::<_, Notification>(
            r#"INSERT INTO notifications (kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body)
               VALUES (
                   $1, $2,
                   (SELECT display_name FROM users WHERE id = $2),
                   $3,
                   (SELECT display_name FROM users WHERE id = $3),
                   $4, $5
               )
               RETURNING id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at"#,
        )
        .bind(plan.kind.as_str())
        .bind(plan.sender_id)
        .bind(plan.recipient_id)
        .bind(plan.task_id)
        .bind(&plan.body)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(BidDecision::Done(notice))
    }

    pub async fn list_received_notifications(
        &self,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications
               WHERE recipient_id = $1
               ORDER BY created_at DESC, id DESC
               LIMIT $2 OFFSET $3"#,
        )
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_unread(&self, recipient_id: Uuid) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND is_read = false",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn get_notification(&self, id: Uuid) -> anyhow::Result<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> anyhow::Result<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>(
            r#"UPDATE notifications SET is_read = true, updated_at = NOW()
               WHERE id = $1
               RETURNING id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Everything the user has sent or received. One query instead of two
    /// live listeners; the chat projection runs over this set.
    pub async fn list_user_notifications(&self, user_id: Uuid) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications
               WHERE sender_id = $1 OR recipient_id = $1
               ORDER BY created_at DESC, id DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Sent-by-me subset for one task, ascending.
    pub async fn list_task_sent(&self, task_id: Uuid, me: Uuid) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications
               WHERE task_id = $1 AND sender_id = $2
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(task_id)
        .bind(me)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Received-by-me subset for one task, ascending.
    pub async fn list_task_received(
        &self,
        task_id: Uuid,
        me: Uuid,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"SELECT id, kind, sender_id, sender_name, recipient_id, recipient_name, task_id, body, bid_amount, is_read, created_at, updated_at
               FROM notifications
               WHERE task_id = $1 AND recipient_id = $2
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(task_id)
        .bind(me)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Whether the user has any notification on the task's thread.
    pub async fn user_in_task_thread(&self, task_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE task_id = $1 AND (sender_id = $2 OR recipient_id = $2))",
        )
        .bind(task_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Retention: drop read notifications older than `days`. Unread rows are
    /// never expired.
    pub async fn purge_read_notifications(&self, days: u32) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "DELETE FROM notifications WHERE is_read = true AND created_at < NOW() - make_interval(days => $1)",
        )
        .bind(days as i32)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
