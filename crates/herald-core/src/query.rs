//! Read side: filtered listing, search, counts and statistics.
//!
//! Every result carries the derived fields the UI needs and, where the record
//! has one, the sender's identity from the user directory.

use std::{
  collections::{BTreeMap, HashMap},
  sync::Arc,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  directory::{UserDirectory, UserSummary},
  notification::{
    Category, EntityResolver, EntitySummary, Notification, NotificationType,
    Priority,
  },
  store::{
    Listing, NotificationFilter, NotificationStore, PageRequest, Sort,
    SortField, SortOrder, store_err,
  },
};

// ─── Result types ────────────────────────────────────────────────────────────

/// A notification as presented to its recipient.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
  #[serde(flatten)]
  pub notification: Notification,
  pub sender_info:  Option<UserSummary>,
  pub is_urgent:    bool,
  pub is_overdue:   bool,
  pub time_ago:     String,
}

impl NotificationView {
  pub fn new(
    notification: Notification,
    sender_info: Option<UserSummary>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      is_urgent: notification.is_urgent(),
      is_overdue: notification.is_overdue(now),
      time_ago: notification.time_ago(now),
      sender_info,
      notification,
    }
  }
}

/// A single notification together with its resolved related entity.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationDetail {
  #[serde(flatten)]
  pub view:    NotificationView,
  pub related: Option<EntitySummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page:  u32,
  pub limit: u32,
  pub total: u64,
  pub pages: u64,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
    Self {
      items,
      page: request.page(),
      limit: request.limit(),
      total,
      pages: total.div_ceil(u64::from(request.limit())),
    }
  }
}

/// Aggregate counts for one recipient. The maps contain only keys that occur.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationStats {
  pub total:       u64,
  pub unread:      u64,
  pub by_type:     BTreeMap<NotificationType, u64>,
  pub by_priority: BTreeMap<Priority, u64>,
}

/// Filters and ordering accepted by [`QueryService::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListParams {
  #[serde(rename = "type")]
  pub notification_type: Option<NotificationType>,
  pub category:          Option<Category>,
  pub priority:          Option<Priority>,
  pub is_read:           Option<bool>,
  pub sort_by:           SortField,
  pub sort_order:        SortOrder,
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct QueryService<S, D> {
  store:     Arc<S>,
  directory: Arc<D>,
}

impl<S, D> Clone for QueryService<S, D> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), directory: self.directory.clone() }
  }
}

impl<S: NotificationStore, D: UserDirectory> QueryService<S, D> {
  pub fn new(store: Arc<S>, directory: Arc<D>) -> Self { Self { store, directory } }

  /// Filtered, sorted, paginated listing. Defaults: newest first, page 1,
  /// 20 per page.
  pub async fn list(
    &self,
    recipient: Uuid,
    params: ListParams,
    page: PageRequest,
  ) -> Result<Page<NotificationView>> {
    let filter = NotificationFilter {
      notification_type: params.notification_type,
      category: params.category,
      priority: params.priority,
      is_read: params.is_read,
      ..NotificationFilter::for_recipient(recipient)
    };
    let sort = Sort { field: params.sort_by, order: params.sort_order };
    self.page(filter, sort, page).await
  }

  pub async fn get_by_id(&self, recipient: Uuid, id: Uuid) -> Result<NotificationView> {
    let notification = self
      .store
      .find_by_id(id, recipient)
      .await
      .map_err(store_err)?
      .ok_or(Error::NotFound(id))?;
    let mut views = self.attach_senders(vec![notification]).await?;
    views.pop().ok_or(Error::NotFound(id))
  }

  /// [`Self::get_by_id`] plus the related entity, looked up through
  /// `resolver`.
  pub async fn detail<R: EntityResolver>(
    &self,
    recipient: Uuid,
    id: Uuid,
    resolver: &R,
  ) -> Result<NotificationDetail> {
    let view = self.get_by_id(recipient, id).await?;
    let related = match view.notification.related_entity {
      Some(entity) => entity.resolve(resolver).await?,
      None => None,
    };
    Ok(NotificationDetail { view, related })
  }

  pub async fn by_category(
    &self,
    recipient: Uuid,
    category: Category,
    page: PageRequest,
  ) -> Result<Page<NotificationView>> {
    let filter = NotificationFilter {
      category: Some(category),
      ..NotificationFilter::for_recipient(recipient)
    };
    self.page(filter, Sort::default(), page).await
  }

  /// Case-insensitive substring search over title and message.
  pub async fn search(
    &self,
    recipient: Uuid,
    text: &str,
    page: PageRequest,
  ) -> Result<Page<NotificationView>> {
    let text = text.trim();
    if text.is_empty() {
      return Err(Error::InvalidInput("search text must not be empty".into()));
    }
    let filter = NotificationFilter {
      text: Some(text.to_owned()),
      ..NotificationFilter::for_recipient(recipient)
    };
    self.page(filter, Sort::default(), page).await
  }

  pub async fn unread_count(&self, recipient: Uuid) -> Result<u64> {
    let filter = NotificationFilter {
      is_read: Some(false),
      ..NotificationFilter::for_recipient(recipient)
    };
    self.store.count(filter).await.map_err(store_err)
  }

  pub async fn stats(&self, recipient: Uuid) -> Result<NotificationStats> {
    let all = NotificationFilter::for_recipient(recipient);
    let total = self.store.count(all.clone()).await.map_err(store_err)?;
    let unread = self.unread_count(recipient).await?;
    let by_type = self
      .store
      .count_by_type(all.clone())
      .await
      .map_err(store_err)?;
    let by_priority = self
      .store
      .count_by_priority(all)
      .await
      .map_err(store_err)?;
    Ok(NotificationStats { total, unread, by_type, by_priority })
  }

  async fn page(
    &self,
    filter: NotificationFilter,
    sort: Sort,
    page: PageRequest,
  ) -> Result<Page<NotificationView>> {
    let Listing { items, total } = self
      .store
      .find_by_filter(filter, sort, page)
      .await
      .map_err(store_err)?;
    let views = self.attach_senders(items).await?;
    Ok(Page::new(views, page, total))
  }

  /// Look each distinct sender up once.
  async fn attach_senders(
    &self,
    items: Vec<Notification>,
  ) -> Result<Vec<NotificationView>> {
    let mut senders: HashMap<Uuid, Option<UserSummary>> = HashMap::new();
    for id in items.iter().filter_map(|n| n.sender) {
      if senders.contains_key(&id) {
        continue;
      }
      let user = self
        .directory
        .find_user_by_id(id)
        .await
        .map_err(|e| Error::Lookup(Box::new(e)))?;
      senders.insert(id, user);
    }

    let now = Utc::now();
    Ok(
      items
        .into_iter()
        .map(|n| {
          let sender = n.sender.and_then(|id| senders.get(&id).cloned().flatten());
          NotificationView::new(n, sender, now)
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pages_round_up() {
    let request = PageRequest::new(2, 20).unwrap();
    let page: Page<()> = Page::new(vec![(); 5], request, 25);
    assert_eq!(page.pages, 2);
    assert_eq!(page.page, 2);

    let empty: Page<()> = Page::new(Vec::new(), PageRequest::default(), 0);
    assert_eq!(empty.pages, 0);
  }

  #[test]
  fn list_params_from_query_names() {
    let params: ListParams = serde_json::from_str(
      r#"{"type": "task", "is_read": false, "sort_by": "priority", "sort_order": "asc"}"#,
    )
    .unwrap();
    assert_eq!(params.notification_type, Some(NotificationType::Task));
    assert_eq!(params.is_read, Some(false));
    assert_eq!(params.sort_by, SortField::Priority);
    assert_eq!(params.sort_order, SortOrder::Asc);
  }
}
