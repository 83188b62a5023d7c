//! Business events and the factory that turns them into notifications.
//!
//! Each event is a plain struct carrying only the identifying and display
//! fields of the entity that triggered it. [`NotificationEvent::build`] is
//! pure: it fixes type, category and priority for the event and returns the
//! records to create. The list is empty when the actor would only be notifying
//! themselves.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  delivery::{DeliveryChannel, DeliveryMethods},
  directory::UserDirectory,
  fanout::{NotificationTemplate, ensure_known_users, persist_batch, validate_all},
  notification::{
    Category, MAX_MESSAGE_LEN, NewNotification, Notification,
    NotificationType, Priority, RelatedEntity,
  },
  store::NotificationStore,
};

/// A business event that maps to zero or more notifications.
pub trait NotificationEvent {
  /// Reject events whose own fields contradict each other.
  fn validate(&self) -> Result<()> { Ok(()) }

  fn build(self) -> Vec<NewNotification>;
}

/// A caller-composed notification, created exactly as given.
impl NotificationEvent for NewNotification {
  fn build(self) -> Vec<NewNotification> { vec![self] }
}

// ─── Factory ─────────────────────────────────────────────────────────────────

/// Builds, validates and persists event notifications.
pub struct EventFactory<S, D> {
  store:     Arc<S>,
  directory: Arc<D>,
}

impl<S, D> Clone for EventFactory<S, D> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), directory: self.directory.clone() }
  }
}

impl<S: NotificationStore, D: UserDirectory> EventFactory<S, D> {
  pub fn new(store: Arc<S>, directory: Arc<D>) -> Self { Self { store, directory } }

  /// Build the event's records and store them with one call (a single create,
  /// or one batched insert for fan-out events). A self-notification yields an
  /// empty result and no write.
  ///
  /// Recipients and senders must exist in the user directory; a directory
  /// failure aborts creation.
  pub async fn notify<E: NotificationEvent>(&self, event: E) -> Result<Vec<Notification>> {
    event.validate()?;
    let records = event.build();
    if records.is_empty() {
      return Ok(Vec::new());
    }
    validate_all(&records)?;
    ensure_known_users(self.directory.as_ref(), &records).await?;
    persist_batch(self.store.as_ref(), records).await
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Task-assignment notifications sit one level below the task itself:
/// urgent → high, high → medium, anything else → low.
pub fn assignment_priority(task_priority: Priority) -> Priority {
  match task_priority {
    Priority::Urgent => Priority::High,
    Priority::High => Priority::Medium,
    Priority::Medium | Priority::Low => Priority::Low,
  }
}

fn is_self(recipient: Uuid, actor: Option<Uuid>) -> bool { actor == Some(recipient) }

/// Cut `text` to fit the message bound, marking the cut with an ellipsis.
fn clip(text: &str, max: usize) -> String {
  let text = text.trim();
  if text.chars().count() <= max {
    return text.to_owned();
  }
  let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
  out.push('…');
  out
}

/// Clip the message of an event-built record to the storage bound.
fn fit(mut n: NewNotification) -> NewNotification {
  n.message = clip(&n.message, MAX_MESSAGE_LEN);
  n
}

fn single(n: NewNotification) -> Vec<NewNotification> { vec![fit(n)] }

/// Fan a record out to `recipients`, leaving the actor off the list.
fn fan_out(
  n: NewNotification,
  recipients: Vec<Uuid>,
  actor: Option<Uuid>,
) -> Vec<NewNotification> {
  let template = NotificationTemplate::from(fit(n));
  template.fan_out(recipients.into_iter().filter(|id| Some(*id) != actor))
}

fn money(amount: f64, currency: &str) -> String { format!("{currency} {amount:.2}") }

// ─── Tasks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TaskAssigned {
  pub task_id:       Uuid,
  pub task_title:    String,
  pub task_priority: Priority,
  pub due_date:      Option<DateTime<Utc>>,
  pub project_name:  Option<String>,
  pub assignee:      Uuid,
  pub assigned_by:   Option<Uuid>,
}

impl NotificationEvent for TaskAssigned {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.assignee, self.assigned_by) {
      return Vec::new();
    }
    single(
      NewNotification::new(
        self.assignee,
        NotificationType::Task,
        Category::Task,
        "New Task Assigned",
        format!("You have been assigned to task: {}", self.task_title),
      )
      .sender(self.assigned_by)
      .priority(assignment_priority(self.task_priority))
      .action(format!("/tasks/{}", self.task_id), "View Task")
      .related(RelatedEntity::Task(self.task_id))
      .meta("task_priority", self.task_priority.as_ref())
      .meta("due_date", self.due_date)
      .meta("project_name", self.project_name),
    )
  }
}

#[derive(Debug, Clone)]
pub struct TaskCompleted {
  pub task_id:      Uuid,
  pub task_title:   String,
  pub completed_by: Uuid,
  /// Usually the task's creator or assigner.
  pub notify:       Uuid,
}

impl NotificationEvent for TaskCompleted {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.notify, Some(self.completed_by)) {
      return Vec::new();
    }
    single(
      NewNotification::new(
        self.notify,
        NotificationType::Success,
        Category::Task,
        "Task Completed",
        format!("Task \"{}\" has been marked as completed", self.task_title),
      )
      .sender(Some(self.completed_by))
      .action(format!("/tasks/{}", self.task_id), "View Task")
      .related(RelatedEntity::Task(self.task_id)),
    )
  }
}

/// Raised by a scheduled check; there is no actor.
#[derive(Debug, Clone)]
pub struct TaskOverdue {
  pub task_id:    Uuid,
  pub task_title: String,
  pub due_date:   DateTime<Utc>,
  pub assignee:   Uuid,
}

impl NotificationEvent for TaskOverdue {
  fn build(self) -> Vec<NewNotification> {
    single(
      NewNotification::new(
        self.assignee,
        NotificationType::Warning,
        Category::Task,
        "Task Overdue",
        format!(
          "Task \"{}\" was due on {}",
          self.task_title,
          self.due_date.format("%Y-%m-%d")
        ),
      )
      .priority(Priority::High)
      .action(format!("/tasks/{}", self.task_id), "View Task")
      .related(RelatedEntity::Task(self.task_id))
      .meta("due_date", self.due_date),
    )
  }
}

#[derive(Debug, Clone)]
pub struct TaskCommentAdded {
  pub task_id:        Uuid,
  pub task_title:     String,
  pub comment:        String,
  pub commenter:      Uuid,
  pub commenter_name: String,
  pub recipient:      Uuid,
}

impl NotificationEvent for TaskCommentAdded {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.recipient, Some(self.commenter)) {
      return Vec::new();
    }
    single(
      NewNotification::new(
        self.recipient,
        NotificationType::Info,
        Category::Task,
        "New Comment",
        format!(
          "{} commented on \"{}\": {}",
          self.commenter_name,
          self.task_title,
          clip(&self.comment, 200)
        ),
      )
      .sender(Some(self.commenter))
      .priority(Priority::Low)
      .action(format!("/tasks/{}#comments", self.task_id), "View Comment")
      .related(RelatedEntity::Task(self.task_id)),
    )
  }
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProjectMemberAdded {
  pub project_id:   Uuid,
  pub project_name: String,
  pub role:         Option<String>,
  pub member:       Uuid,
  pub added_by:     Option<Uuid>,
}

impl NotificationEvent for ProjectMemberAdded {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.member, self.added_by) {
      return Vec::new();
    }
    let message = match &self.role {
      Some(role) => format!(
        "You have been added to project \"{}\" as {role}",
        self.project_name
      ),
      None => format!("You have been added to project \"{}\"", self.project_name),
    };
    single(
      NewNotification::new(
        self.member,
        NotificationType::Project,
        Category::Team,
        "Added to Project Team",
        message,
      )
      .sender(self.added_by)
      .action(format!("/projects/{}", self.project_id), "View Project")
      .related(RelatedEntity::Project(self.project_id))
      .meta("role", self.role),
    )
  }
}

#[derive(Debug, Clone)]
pub struct ProjectUpdated {
  pub project_id:   Uuid,
  pub project_name: String,
  pub changes:      String,
  pub team:         Vec<Uuid>,
  pub updated_by:   Option<Uuid>,
}

impl NotificationEvent for ProjectUpdated {
  fn build(self) -> Vec<NewNotification> {
    fan_out(
      NewNotification::new(
        Uuid::nil(),
        NotificationType::Project,
        Category::Project,
        "Project Updated",
        format!("Project \"{}\" was updated: {}", self.project_name, self.changes),
      )
      .sender(self.updated_by)
      .priority(Priority::Low)
      .action(format!("/projects/{}", self.project_id), "View Project")
      .related(RelatedEntity::Project(self.project_id)),
      self.team,
      self.updated_by,
    )
  }
}

/// Raised by a scheduled check; there is no actor.
#[derive(Debug, Clone)]
pub struct ProjectDeadlineApproaching {
  pub project_id:     Uuid,
  pub project_name:   String,
  pub deadline:       NaiveDate,
  pub days_remaining: u32,
  pub team:           Vec<Uuid>,
}

impl NotificationEvent for ProjectDeadlineApproaching {
  fn build(self) -> Vec<NewNotification> {
    let priority = if self.days_remaining <= 3 { Priority::High } else { Priority::Medium };
    let when = match self.days_remaining {
      0 => "today".to_owned(),
      1 => "tomorrow".to_owned(),
      n => format!("in {n} days"),
    };
    fan_out(
      NewNotification::new(
        Uuid::nil(),
        NotificationType::Warning,
        Category::Project,
        "Project Deadline Approaching",
        format!(
          "Project \"{}\" is due {when} ({})",
          self.project_name,
          self.deadline.format("%Y-%m-%d")
        ),
      )
      .priority(priority)
      .action(format!("/projects/{}", self.project_id), "View Project")
      .related(RelatedEntity::Project(self.project_id))
      .meta("deadline", self.deadline)
      .meta("days_remaining", self.days_remaining),
      self.team,
      None,
    )
  }
}

// ─── HR ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LeaveRequested {
  pub leave_id:      Uuid,
  pub employee_name: String,
  pub leave_type:    String,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub requested_by:  Uuid,
  pub approver:      Uuid,
}

impl NotificationEvent for LeaveRequested {
  fn validate(&self) -> Result<()> {
    if self.end_date < self.start_date {
      return Err(Error::validation("end_date", "must not be before start_date"));
    }
    Ok(())
  }

  fn build(self) -> Vec<NewNotification> {
    if is_self(self.approver, Some(self.requested_by)) {
      return Vec::new();
    }
    let days = ((self.end_date - self.start_date).num_days() + 1).max(1);
    single(
      NewNotification::new(
        self.approver,
        NotificationType::Hr,
        Category::Hr,
        "New Leave Request",
        format!(
          "{} requested {} leave from {} to {} ({days} day{})",
          self.employee_name,
          self.leave_type,
          self.start_date.format("%Y-%m-%d"),
          self.end_date.format("%Y-%m-%d"),
          if days == 1 { "" } else { "s" },
        ),
      )
      .sender(Some(self.requested_by))
      .action(format!("/hr/leaves/{}", self.leave_id), "Review Request")
      .related(RelatedEntity::Leave(self.leave_id))
      .meta("leave_type", self.leave_type)
      .meta("start_date", self.start_date)
      .meta("end_date", self.end_date)
      .meta("days", days),
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveDecision {
  Approved,
  Rejected,
}

#[derive(Debug, Clone)]
pub struct LeaveStatusUpdated {
  pub leave_id:    Uuid,
  pub leave_type:  String,
  pub decision:    LeaveDecision,
  pub comments:    Option<String>,
  pub reviewed_by: Uuid,
  pub employee:    Uuid,
}

impl NotificationEvent for LeaveStatusUpdated {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.employee, Some(self.reviewed_by)) {
      return Vec::new();
    }
    let (kind, priority, title, verb) = match self.decision {
      LeaveDecision::Approved => {
        (NotificationType::Success, Priority::Medium, "Leave Request Approved", "approved")
      }
      LeaveDecision::Rejected => {
        (NotificationType::Error, Priority::High, "Leave Request Rejected", "rejected")
      }
    };
    let mut message = format!("Your {} leave request has been {verb}", self.leave_type);
    if let Some(comments) = self.comments.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
      message.push_str(&format!(": {comments}"));
    }
    single(
      NewNotification::new(
        self.employee,
        kind,
        Category::Hr,
        title,
        message,
      )
      .sender(Some(self.reviewed_by))
      .priority(priority)
      .action(format!("/hr/leaves/{}", self.leave_id), "View Details")
      .related(RelatedEntity::Leave(self.leave_id))
      .meta("status", verb),
    )
  }
}

/// Raised by attendance processing; there is no actor.
#[derive(Debug, Clone)]
pub struct AttendanceIssue {
  pub attendance_id: Uuid,
  pub employee:      Uuid,
  pub date:          NaiveDate,
  pub issue:         String,
}

impl NotificationEvent for AttendanceIssue {
  fn build(self) -> Vec<NewNotification> {
    single(
      NewNotification::new(
        self.employee,
        NotificationType::Warning,
        Category::Hr,
        "Attendance Issue",
        format!("{} on {}", self.issue, self.date.format("%Y-%m-%d")),
      )
      .action(format!("/hr/attendance/{}", self.attendance_id), "View Attendance")
      .related(RelatedEntity::Attendance(self.attendance_id))
      .meta("date", self.date),
    )
  }
}

// ─── Finance ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PayrollGenerated {
  pub payroll_id: Uuid,
  pub employee:   Uuid,
  pub period:     String,
  pub net_amount: f64,
  pub currency:   String,
}

impl NotificationEvent for PayrollGenerated {
  fn build(self) -> Vec<NewNotification> {
    single(
      NewNotification::new(
        self.employee,
        NotificationType::Finance,
        Category::Finance,
        "Payroll Generated",
        format!(
          "Your payslip for {} is ready. Net pay: {}",
          self.period,
          money(self.net_amount, &self.currency)
        ),
      )
      .action(format!("/finance/payroll/{}", self.payroll_id), "View Payslip")
      .related(RelatedEntity::Payroll(self.payroll_id))
      .meta("period", self.period)
      .meta("net_amount", self.net_amount)
      .meta("currency", self.currency),
    )
  }
}

#[derive(Debug, Clone)]
pub struct InvoiceCreated {
  pub invoice_id:     Uuid,
  pub invoice_number: String,
  pub client_name:    String,
  pub amount:         f64,
  pub currency:       String,
  pub due_date:       NaiveDate,
  pub created_by:     Uuid,
  pub recipient:      Uuid,
}

impl NotificationEvent for InvoiceCreated {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.recipient, Some(self.created_by)) {
      return Vec::new();
    }
    single(
      NewNotification::new(
        self.recipient,
        NotificationType::Finance,
        Category::Finance,
        "Invoice Created",
        format!(
          "Invoice {} for {} ({}) is due on {}",
          self.invoice_number,
          self.client_name,
          money(self.amount, &self.currency),
          self.due_date.format("%Y-%m-%d")
        ),
      )
      .sender(Some(self.created_by))
      .action(format!("/finance/invoices/{}", self.invoice_id), "View Invoice")
      .related(RelatedEntity::Finance(self.invoice_id))
      .meta("invoice_number", self.invoice_number)
      .meta("amount", self.amount)
      .meta("due_date", self.due_date),
    )
  }
}

#[derive(Debug, Clone)]
pub struct PaymentReceived {
  pub invoice_id:     Uuid,
  pub invoice_number: String,
  pub payer_name:     String,
  pub amount:         f64,
  pub currency:       String,
  pub recipient:      Uuid,
}

impl NotificationEvent for PaymentReceived {
  fn build(self) -> Vec<NewNotification> {
    single(
      NewNotification::new(
        self.recipient,
        NotificationType::Success,
        Category::Finance,
        "Payment Received",
        format!(
          "{} paid {} against invoice {}",
          self.payer_name,
          money(self.amount, &self.currency),
          self.invoice_number
        ),
      )
      .action(format!("/finance/invoices/{}", self.invoice_id), "View Invoice")
      .related(RelatedEntity::Finance(self.invoice_id))
      .meta("invoice_number", self.invoice_number)
      .meta("amount", self.amount),
    )
  }
}

/// Always high priority.
#[derive(Debug, Clone)]
pub struct BudgetExceeded {
  pub project_id:   Uuid,
  pub project_name: String,
  pub budget:       f64,
  pub spent:        f64,
  pub currency:     String,
  pub recipients:   Vec<Uuid>,
}

impl NotificationEvent for BudgetExceeded {
  fn build(self) -> Vec<NewNotification> {
    let overrun = self.spent - self.budget;
    let percent = if self.budget > 0.0 { overrun / self.budget * 100.0 } else { 100.0 };
    fan_out(
      NewNotification::new(
        Uuid::nil(),
        NotificationType::Warning,
        Category::Finance,
        "Budget Exceeded",
        format!(
          "Project \"{}\" has spent {} of its {} budget ({percent:.1}% over)",
          self.project_name,
          money(self.spent, &self.currency),
          money(self.budget, &self.currency),
        ),
      )
      .priority(Priority::High)
      .action(format!("/projects/{}/budget", self.project_id), "Review Budget")
      .related(RelatedEntity::Project(self.project_id))
      .meta("budget", self.budget)
      .meta("spent", self.spent)
      .meta("overrun", overrun),
      self.recipients,
      None,
    )
  }
}

// ─── Security & system ───────────────────────────────────────────────────────

/// Always urgent; never suppressed, even when the account in question is
/// the recipient's own.
#[derive(Debug, Clone)]
pub struct SecurityAlert {
  pub recipient:  Uuid,
  pub alert:      String,
  pub details:    String,
  pub ip_address: Option<String>,
  pub user_id:    Option<Uuid>,
}

impl NotificationEvent for SecurityAlert {
  fn build(self) -> Vec<NewNotification> {
    let mut n = NewNotification::new(
      self.recipient,
      NotificationType::Error,
      Category::Security,
      clip(&format!("Security Alert: {}", self.alert), 100),
      self.details,
    )
    .priority(Priority::Urgent)
    .channels(DeliveryMethods::from([DeliveryChannel::InApp, DeliveryChannel::Email]))
    .action("/settings/security", "Review Activity")
    .meta("ip_address", self.ip_address);
    if let Some(user_id) = self.user_id {
      n = n.related(RelatedEntity::User(user_id));
    }
    single(n)
  }
}

#[derive(Debug, Clone)]
pub struct SystemMaintenance {
  pub starts_at:   DateTime<Utc>,
  pub ends_at:     DateTime<Utc>,
  pub description: String,
  pub recipients:  Vec<Uuid>,
}

impl SystemMaintenance {
  /// The role-independent part of the announcement, for
  /// [`crate::fanout::FanoutHelper::notify_by_role`].
  pub fn template(&self) -> NotificationTemplate {
    NotificationTemplate::from(fit(
      NewNotification::new(
        Uuid::nil(),
        NotificationType::System,
        Category::System,
        "Scheduled Maintenance",
        format!(
          "{} The system will be unavailable from {} to {} UTC.",
          self.description.trim(),
          self.starts_at.format("%Y-%m-%d %H:%M"),
          self.ends_at.format("%Y-%m-%d %H:%M"),
        ),
      )
      .priority(Priority::High)
      .scheduled_for(self.starts_at)
      .expires_at(self.ends_at)
      .meta("starts_at", self.starts_at)
      .meta("ends_at", self.ends_at),
    ))
  }
}

impl NotificationEvent for SystemMaintenance {
  fn validate(&self) -> Result<()> {
    if self.ends_at < self.starts_at {
      return Err(Error::validation("ends_at", "must not be before starts_at"));
    }
    Ok(())
  }

  fn build(self) -> Vec<NewNotification> {
    self.template().fan_out(self.recipients)
  }
}

// ─── Content ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ContentPublished {
  pub content_id:    Uuid,
  pub content_title: String,
  pub author:        Uuid,
  pub author_name:   String,
  pub subscribers:   Vec<Uuid>,
}

impl NotificationEvent for ContentPublished {
  fn build(self) -> Vec<NewNotification> {
    fan_out(
      NewNotification::new(
        Uuid::nil(),
        NotificationType::Content,
        Category::Content,
        "New Content Published",
        format!("{} published \"{}\"", self.author_name, self.content_title),
      )
      .sender(Some(self.author))
      .priority(Priority::Low)
      .action(format!("/content/{}", self.content_id), "Read Now")
      .related(RelatedEntity::Content(self.content_id)),
      self.subscribers,
      Some(self.author),
    )
  }
}

#[derive(Debug, Clone)]
pub struct ContentReviewNeeded {
  pub content_id:    Uuid,
  pub content_title: String,
  pub author:        Uuid,
  pub author_name:   String,
  pub reviewer:      Uuid,
}

impl NotificationEvent for ContentReviewNeeded {
  fn build(self) -> Vec<NewNotification> {
    if is_self(self.reviewer, Some(self.author)) {
      return Vec::new();
    }
    single(
      NewNotification::new(
        self.reviewer,
        NotificationType::Content,
        Category::Content,
        "Content Review Needed",
        format!(
          "{} submitted \"{}\" for review",
          self.author_name, self.content_title
        ),
      )
      .sender(Some(self.author))
      .action(format!("/content/{}/review", self.content_id), "Review")
      .related(RelatedEntity::Content(self.content_id)),
    )
  }
}

// ─── Analytics ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ReportGenerated {
  pub report_name:  String,
  pub report_type:  String,
  pub download_url: String,
  pub recipient:    Uuid,
}

impl NotificationEvent for ReportGenerated {
  fn build(self) -> Vec<NewNotification> {
    single(
      NewNotification::new(
        self.recipient,
        NotificationType::Success,
        Category::Analytics,
        "Report Ready",
        format!("Your {} report \"{}\" is ready to download", self.report_type, self.report_name),
      )
      .priority(Priority::Low)
      .action(self.download_url, "Download")
      .meta("report_type", self.report_type),
    )
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::notification::MetaValue;

  fn assigned(assignee: Uuid, by: Option<Uuid>, priority: Priority) -> TaskAssigned {
    TaskAssigned {
      task_id:       Uuid::new_v4(),
      task_title:    "Ship release".into(),
      task_priority: priority,
      due_date:      None,
      project_name:  Some("Apollo".into()),
      assignee,
      assigned_by:   by,
    }
  }

  #[test]
  fn self_assignment_is_a_no_op() {
    let u1 = Uuid::new_v4();
    assert!(assigned(u1, Some(u1), Priority::High).build().is_empty());
  }

  #[test]
  fn assignment_priority_is_capped_below_task_priority() {
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let cases = [
      (Priority::Urgent, Priority::High),
      (Priority::High, Priority::Medium),
      (Priority::Medium, Priority::Low),
      (Priority::Low, Priority::Low),
    ];
    for (task, expected) in cases {
      let built = assigned(u1, Some(u2), task).build();
      assert_eq!(built.len(), 1);
      assert_eq!(built[0].priority, expected, "task priority {task}");
      assert_eq!(built[0].sender, Some(u2));
      assert_eq!(built[0].category, Category::Task);
    }
  }

  #[test]
  fn assignment_records_task_snapshot() {
    let u1 = Uuid::new_v4();
    let event = assigned(u1, None, Priority::Urgent);
    let task_id = event.task_id;
    let n = event.build().remove(0);
    assert_eq!(n.related_entity, Some(RelatedEntity::Task(task_id)));
    assert_eq!(n.metadata["task_priority"], MetaValue::Text("urgent".into()));
    assert_eq!(n.metadata["due_date"], MetaValue::Null);
    assert_eq!(n.action_url.as_deref(), Some(format!("/tasks/{task_id}").as_str()));
  }

  #[test]
  fn security_alert_is_urgent_even_for_self() {
    let u1 = Uuid::new_v4();
    let built = SecurityAlert {
      recipient:  u1,
      alert:      "New sign-in".into(),
      details:    "Signed in from a new device".into(),
      ip_address: Some("203.0.113.9".into()),
      user_id:    Some(u1),
    }
    .build();
    assert_eq!(built.len(), 1);
    assert_eq!(built[0].priority, Priority::Urgent);
    assert_eq!(built[0].category, Category::Security);
    assert!(built[0].delivery_methods.contains(&DeliveryChannel::Email));
  }

  #[test]
  fn budget_exceeded_fans_out_at_high_priority() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let built = BudgetExceeded {
      project_id:   Uuid::new_v4(),
      project_name: "Apollo".into(),
      budget:       1000.0,
      spent:        1250.0,
      currency:     "USD".into(),
      recipients:   vec![a, b],
    }
    .build();
    assert_eq!(built.len(), 2);
    assert!(built.iter().all(|n| n.priority == Priority::High));
    assert!(built[0].message.contains("25.0% over"));
    assert_eq!(built[0].metadata["overrun"], MetaValue::Float(250.0));
  }

  #[test]
  fn project_update_skips_the_updater() {
    let (a, b, actor) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let built = ProjectUpdated {
      project_id:   Uuid::new_v4(),
      project_name: "Apollo".into(),
      changes:      "deadline moved".into(),
      team:         vec![a, actor, b],
      updated_by:   Some(actor),
    }
    .build();
    let recipients: Vec<Uuid> = built.iter().map(|n| n.recipient).collect();
    assert_eq!(recipients, vec![a, b]);
  }

  #[test]
  fn leave_decision_shapes_type_and_priority() {
    let employee = Uuid::new_v4();
    let event = |decision| LeaveStatusUpdated {
      leave_id: Uuid::new_v4(),
      leave_type: "annual".into(),
      decision,
      comments: Some("  enjoy ".into()),
      reviewed_by: Uuid::new_v4(),
      employee,
    };
    let approved = event(LeaveDecision::Approved).build().remove(0);
    assert_eq!(approved.notification_type, NotificationType::Success);
    assert_eq!(approved.title, "Leave Request Approved");
    assert!(approved.message.ends_with("approved: enjoy"));

    let rejected = event(LeaveDecision::Rejected).build().remove(0);
    assert_eq!(rejected.notification_type, NotificationType::Error);
    assert_eq!(rejected.priority, Priority::High);
  }

  #[test]
  fn leave_request_counts_inclusive_days() {
    let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
    let n = LeaveRequested {
      leave_id:      Uuid::new_v4(),
      employee_name: "Grace".into(),
      leave_type:    "sick".into(),
      start_date:    start,
      end_date:      start + Duration::days(2),
      requested_by:  Uuid::new_v4(),
      approver:      Uuid::new_v4(),
    }
    .build()
    .remove(0);
    assert_eq!(n.metadata["days"], MetaValue::Int(3));
    assert!(n.message.contains("(3 days)"));
  }

  fn leave(start_date: NaiveDate, end_date: NaiveDate) -> LeaveRequested {
    LeaveRequested {
      leave_id:      Uuid::new_v4(),
      employee_name: "Grace".into(),
      leave_type:    "annual".into(),
      start_date,
      end_date,
      requested_by:  Uuid::new_v4(),
      approver:      Uuid::new_v4(),
    }
  }

  #[test]
  fn reversed_leave_dates_are_rejected() {
    let start = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
    assert!(leave(start, start).validate().is_ok());

    let reversed = leave(start, start - Duration::days(2));
    assert_eq!(reversed.validate().unwrap_err().field(), Some("end_date"));

    // Built directly, the day count never goes below one.
    let n = reversed.build().remove(0);
    assert_eq!(n.metadata["days"], MetaValue::Int(1));
    assert!(n.message.ends_with("(1 day)"));
  }

  #[test]
  fn long_comments_are_clipped() {
    let n = TaskCommentAdded {
      task_id:        Uuid::new_v4(),
      task_title:     "Ship".into(),
      comment:        "z".repeat(1_000),
      commenter:      Uuid::new_v4(),
      commenter_name: "Ada".into(),
      recipient:      Uuid::new_v4(),
    }
    .build()
    .remove(0);
    assert!(n.message.chars().count() <= MAX_MESSAGE_LEN);
    assert!(n.message.ends_with('…'));
    assert!(n.validate().is_ok());
  }

  #[test]
  fn maintenance_has_no_actor_guard() {
    let u1 = Uuid::new_v4();
    let now = Utc::now();
    let built = SystemMaintenance {
      starts_at:   now + Duration::hours(2),
      ends_at:     now + Duration::hours(4),
      description: "Database upgrade.".into(),
      recipients:  vec![u1],
    }
    .build();
    assert_eq!(built.len(), 1);
    assert_eq!(built[0].sender, None);
    assert_eq!(built[0].expires_at, Some(now + Duration::hours(4)));
  }

  #[test]
  fn maintenance_window_must_not_end_before_it_starts() {
    let now = Utc::now();
    let event = SystemMaintenance {
      starts_at:   now + Duration::hours(4),
      ends_at:     now + Duration::hours(2),
      description: "Database upgrade.".into(),
      recipients:  vec![Uuid::new_v4()],
    };
    assert_eq!(event.validate().unwrap_err().field(), Some("ends_at"));
  }
}
