//! Database service: the single process-wide connection pool and the plain
//! CRUD queries outside the receipt lifecycle.

use crate::error::AppError;
use crate::models::{
    AttendanceListing, AttendanceRecord, CreateIntern, Intern, MarkAttendance, SanitizedUser,
    Session, UpdateIntern, User,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create the process-wide connection pool.
    #[instrument(skip(database_url))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .idle_timeout(std::time::Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Drain the pool on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // -------------------------------------------------------------------------
    // Admin accounts
    // -------------------------------------------------------------------------

    #[instrument(skip(self, email))]
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user_by_email"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, full_name, permission, status, created_utc
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to look up user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, email, password_hash, full_name, permission, status, created_utc
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<SanitizedUser>, AppError> {
        let users = sqlx::query_as::<_, SanitizedUser>(
            r#"
            SELECT user_id, email, full_name, permission, status
            FROM users
            ORDER BY created_utc DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list users: {}", e)))?;

        Ok(users)
    }

    /// Create an admin account. Duplicate emails surface as `Conflict`.
    #[instrument(skip(self, password_hash), fields(email = %email))]
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
        permission: &str,
    ) -> Result<SanitizedUser, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_user"])
            .start_timer();

        let user = sqlx::query_as::<_, SanitizedUser>(
            r#"
            INSERT INTO users (user_id, email, password_hash, full_name, permission)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, email, full_name, permission, status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(permission)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "An admin with email {} already exists",
                    email
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();

        info!(user_id = %user.user_id, "Admin account created");

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn set_user_status(&self, user_id: Uuid, status: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(status)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update user status: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn update_user_name(&self, user_id: Uuid, full_name: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET full_name = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(full_name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update user name: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, email))]
    pub async fn update_user_email(&self, user_id: Uuid, email: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET email = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict(anyhow::anyhow!("Email {} is already in use", email))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update email: {}", e)),
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, password_hash))]
    pub async fn update_user_password(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update password: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Admin has recorded receipts or payments and cannot be deleted; disable the account instead"
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to delete user: {}", e)),
            })?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Sessions
    // -------------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn create_session(&self, user_id: Uuid, ttl_hours: i64) -> Result<Session, AppError> {
        let expires = Utc::now() + Duration::hours(ttl_hours);
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, expires_utc)
            VALUES ($1, $2, $3)
            RETURNING token, user_id, created_utc, expires_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expires)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create session: {}", e)))?;

        Ok(session)
    }

    /// Resolve a session token to its user, ignoring expired sessions.
    #[instrument(skip(self, token))]
    pub async fn find_session_user(&self, token: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.user_id, u.email, u.password_hash, u.full_name, u.permission, u.status, u.created_utc
            FROM sessions s
            JOIN users u ON u.user_id = s.user_id
            WHERE s.token = $1 AND s.expires_utc > NOW() AND u.status = 'active'
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to resolve session: {}", e)))?;

        Ok(user)
    }

    #[instrument(skip(self, token))]
    pub async fn delete_session(&self, token: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete session: {}", e))
            })?;
        Ok(())
    }

    /// Drop all sessions for a user except the given one. Used after a
    /// password change.
    #[instrument(skip(self, keep))]
    pub async fn rotate_sessions(&self, user_id: Uuid, keep: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token != $2")
            .bind(user_id)
            .bind(keep)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to rotate sessions: {}", e))
            })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Interns
    // -------------------------------------------------------------------------

    /// Register an intern. Duplicate emails surface as `Conflict`, detected
    /// via the uniqueness constraint rather than a racy pre-check. Runs on
    /// the caller's transaction so the welcome-letter outbox row commits
    /// with the intern.
    #[instrument(skip(self, conn, input), fields(email = %input.email))]
    pub async fn create_intern_on(
        &self,
        conn: &mut PgConnection,
        input: &CreateIntern,
    ) -> Result<Intern, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_intern"])
            .start_timer();

        let intern = sqlx::query_as::<_, Intern>(
            r#"
            INSERT INTO interns (
                intern_id, first_name, last_name, email, phone, school, degree,
                year_of_study, gpa, department, start_date, end_date, mentor, skills, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING intern_id, first_name, last_name, email, phone, school, degree,
                year_of_study, gpa, department, start_date, end_date, mentor, skills, notes,
                registration_date, status, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.school)
        .bind(&input.degree)
        .bind(&input.year_of_study)
        .bind(input.gpa)
        .bind(&input.department)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.mentor)
        .bind(&input.skills)
        .bind(&input.notes)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "An intern with this email is already registered"
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to register intern: {}", e)),
        })?;

        timer.observe_duration();

        info!(intern_id = %intern.intern_id, "Intern registered");

        Ok(intern)
    }

    #[instrument(skip(self))]
    pub async fn get_intern(&self, intern_id: Uuid) -> Result<Option<Intern>, AppError> {
        let intern = sqlx::query_as::<_, Intern>(
            r#"
            SELECT intern_id, first_name, last_name, email, phone, school, degree,
                year_of_study, gpa, department, start_date, end_date, mentor, skills, notes,
                registration_date, status, created_utc
            FROM interns
            WHERE intern_id = $1
            "#,
        )
        .bind(intern_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get intern: {}", e)))?;

        Ok(intern)
    }

    #[instrument(skip(self))]
    pub async fn list_interns(&self) -> Result<Vec<Intern>, AppError> {
        let interns = sqlx::query_as::<_, Intern>(
            r#"
            SELECT intern_id, first_name, last_name, email, phone, school, degree,
                year_of_study, gpa, department, start_date, end_date, mentor, skills, notes,
                registration_date, status, created_utc
            FROM interns
            ORDER BY first_name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list interns: {}", e)))?;

        Ok(interns)
    }

    /// Fuzzy search over active interns by name or email.
    #[instrument(skip(self, query))]
    pub async fn search_interns(&self, query: &str) -> Result<Vec<Intern>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["search_interns"])
            .start_timer();

        let pattern = format!("%{}%", query);
        let interns = sqlx::query_as::<_, Intern>(
            r#"
            SELECT intern_id, first_name, last_name, email, phone, school, degree,
                year_of_study, gpa, department, start_date, end_date, mentor, skills, notes,
                registration_date, status, created_utc
            FROM interns
            WHERE status = 'active'
              AND (first_name ILIKE $1
                   OR last_name ILIKE $1
                   OR email ILIKE $1
                   OR (first_name || ' ' || last_name) ILIKE $1)
            ORDER BY first_name ASC
            LIMIT 10
            "#,
        )
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Intern search failed: {}", e)))?;

        timer.observe_duration();

        Ok(interns)
    }

    #[instrument(skip(self, input))]
    pub async fn update_intern(
        &self,
        intern_id: Uuid,
        input: &UpdateIntern,
    ) -> Result<Option<Intern>, AppError> {
        let status = input.status.map(|s| s.as_str().to_string());
        let intern = sqlx::query_as::<_, Intern>(
            r#"
            UPDATE interns
            SET first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                school = COALESCE($5, school),
                degree = COALESCE($6, degree),
                year_of_study = COALESCE($7, year_of_study),
                gpa = COALESCE($8, gpa),
                department = COALESCE($9, department),
                start_date = COALESCE($10, start_date),
                end_date = COALESCE($11, end_date),
                mentor = COALESCE($12, mentor),
                skills = COALESCE($13, skills),
                notes = COALESCE($14, notes),
                status = COALESCE($15, status)
            WHERE intern_id = $1
            RETURNING intern_id, first_name, last_name, email, phone, school, degree,
                year_of_study, gpa, department, start_date, end_date, mentor, skills, notes,
                registration_date, status, created_utc
            "#,
        )
        .bind(intern_id)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.phone)
        .bind(&input.school)
        .bind(&input.degree)
        .bind(&input.year_of_study)
        .bind(input.gpa)
        .bind(&input.department)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.mentor)
        .bind(&input.skills)
        .bind(&input.notes)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update intern: {}", e)))?;

        Ok(intern)
    }

    // -------------------------------------------------------------------------
    // Attendance
    // -------------------------------------------------------------------------

    /// Record attendance for one intern/day, overwriting any prior mark.
    #[instrument(skip(self, input), fields(intern_id = %input.intern_id, day = %input.day))]
    pub async fn mark_attendance(
        &self,
        input: &MarkAttendance,
        recorded_by: Uuid,
    ) -> Result<AttendanceRecord, AppError> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance (attendance_id, intern_id, day, status, notes, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (intern_id, day)
            DO UPDATE SET status = EXCLUDED.status,
                          notes = EXCLUDED.notes,
                          recorded_by = EXCLUDED.recorded_by,
                          recorded_utc = NOW()
            RETURNING attendance_id, intern_id, day, status, notes, recorded_by, recorded_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.intern_id)
        .bind(input.day)
        .bind(input.status.as_str())
        .bind(&input.notes)
        .bind(recorded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!("Intern not found"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to mark attendance: {}", e)),
        })?;

        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn attendance_for_day(
        &self,
        day: NaiveDate,
    ) -> Result<Vec<AttendanceListing>, AppError> {
        self.attendance_range(day, day).await
    }

    /// Attendance over a closed day range, joined with intern names, ordered
    /// for display and export.
    #[instrument(skip(self))]
    pub async fn attendance_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceListing>, AppError> {
        let records = sqlx::query_as::<_, AttendanceListing>(
            r#"
            SELECT a.attendance_id, a.intern_id, i.first_name, i.last_name,
                   a.day, a.status, a.notes, a.recorded_utc
            FROM attendance a
            JOIN interns i ON i.intern_id = a.intern_id
            WHERE a.day >= $1 AND a.day <= $2
            ORDER BY a.day, i.last_name, i.first_name
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to load attendance: {}", e))
        })?;

        Ok(records)
    }
}
