//! Derives due-date notifications for a student.
//!
//! For every task visible to the student: a task due tomorrow gets one
//! `due_soon` notification, a task past its due date gets one `overdue`
//! notification. A task that already has either kind is left alone, so a
//! `due_soon` notification is never followed by an `overdue` one.

use bson::{oid::ObjectId, DateTime};
use chrono::{Days, NaiveDate};
use studyx_db::models::{Notification, NotificationType, Task};
use tracing::{debug, info, warn};

use crate::dao::{
    ClassroomDao, NotificationDao, TaskDao,
    base::{Backend, DaoError, DaoResult},
    task::TaskQuery,
};
use crate::session::Session;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DerivationReport {
    pub examined: usize,
    pub due_soon: usize,
    pub overdue: usize,
    pub already_notified: usize,
    /// Tasks whose check or insert failed, with the error text.
    pub failures: Vec<(ObjectId, String)>,
}

impl DerivationReport {
    pub fn created(&self) -> usize {
        self.due_soon + self.overdue
    }
}

enum Outcome {
    Created(NotificationType),
    AlreadyNotified,
    NothingDue,
}

/// Which notification, if any, a task calls for on `today`.
pub fn classify(due_date: NaiveDate, today: NaiveDate) -> Option<NotificationType> {
    if today.checked_add_days(Days::new(1)) == Some(due_date) {
        Some(NotificationType::DueSoon)
    } else if due_date < today {
        Some(NotificationType::Overdue)
    } else {
        None
    }
}

pub fn notification_text(kind: NotificationType, task_title: &str) -> (String, String) {
    match kind {
        NotificationType::DueSoon => (
            "Task Due Tomorrow".to_string(),
            format!("\"{}\" is due tomorrow!", task_title),
        ),
        NotificationType::Overdue => (
            "Task Overdue".to_string(),
            format!("\"{}\" is overdue!", task_title),
        ),
    }
}

pub struct DueDateNotifier {
    classrooms: ClassroomDao,
    tasks: TaskDao,
    notifications: NotificationDao,
}

impl DueDateNotifier {
    pub fn new(backend: &Backend) -> Self {
        Self {
            classrooms: ClassroomDao::new(backend),
            tasks: TaskDao::new(backend),
            notifications: NotificationDao::new(backend),
        }
    }

    /// Runs one derivation pass for `session`. Does nothing for teachers.
    /// Failures on individual tasks are logged and reported; they do not
    /// stop the pass. Failing to load the task set does.
    pub async fn run(&self, session: &Session, today: NaiveDate) -> DaoResult<DerivationReport> {
        let mut report = DerivationReport::default();
        if !session.is_student() {
            return Ok(report);
        }

        let classroom_ids = self
            .classrooms
            .member_classroom_ids(session.user_id)
            .await?;
        let tasks = self
            .tasks
            .list_for_classrooms(&classroom_ids, &TaskQuery::default())
            .await?;

        for task in &tasks {
            let Some(task_id) = task.id else { continue };
            report.examined += 1;
            match self.derive_one(session.user_id, task_id, task, today).await {
                Ok(Outcome::Created(NotificationType::DueSoon)) => report.due_soon += 1,
                Ok(Outcome::Created(NotificationType::Overdue)) => report.overdue += 1,
                Ok(Outcome::AlreadyNotified) => report.already_notified += 1,
                Ok(Outcome::NothingDue) => {}
                Err(e) => {
                    warn!(%task_id, user_id = %session.user_id, error = %e, "Due-date check failed");
                    report.failures.push((task_id, e.to_string()));
                }
            }
        }

        if report.created() > 0 || !report.failures.is_empty() {
            info!(
                user_id = %session.user_id,
                due_soon = report.due_soon,
                overdue = report.overdue,
                failures = report.failures.len(),
                "Due-date notifications derived"
            );
        }
        Ok(report)
    }

    async fn derive_one(
        &self,
        user_id: ObjectId,
        task_id: ObjectId,
        task: &Task,
        today: NaiveDate,
    ) -> DaoResult<Outcome> {
        if self
            .notifications
            .find_for_task(user_id, task_id)
            .await?
            .is_some()
        {
            return Ok(Outcome::AlreadyNotified);
        }

        let Some(kind) = classify(task.due_date, today) else {
            return Ok(Outcome::NothingDue);
        };
        let (title, message) = notification_text(kind, &task.title);
        let notification = Notification {
            id: None,
            user_id,
            notification_type: kind,
            title,
            message,
            task_id: Some(task_id),
            read: false,
            created_at: DateTime::now(),
        };

        match self.notifications.base.insert_one(&notification).await {
            Ok(_) => {
                debug!(%task_id, kind = kind.as_str(), "Notification created");
                Ok(Outcome::Created(kind))
            }
            // Another pass got there first.
            Err(DaoError::DuplicateKey(_)) => Ok(Outcome::AlreadyNotified),
            Err(e) => Err(e),
        }
    }
}
