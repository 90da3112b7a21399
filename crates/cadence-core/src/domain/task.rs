//! Stored task record and search parameters.

use serde::{Deserialize, Serialize};

use super::ids::{OrgId, TaskId, UserId};

/// A stored representation of a Task.
///
/// `id`, `org` and `user` never change after creation. Only `script` is
/// rewritten, through `Store::modify_task`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTask {
    pub id: TaskId,

    /// IDs for the owning organization and user.
    pub org: OrgId,
    pub user: UserId,

    /// Name taken from the script's task options at creation time.
    pub name: String,

    /// The script content of the task.
    pub script: String,
}

/// Parameters for `Store::list_tasks`.
///
/// `org` and `user` are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSearchParams {
    /// Return tasks belonging to this exact organization.
    pub org: Option<OrgId>,

    /// Return tasks belonging to this exact user.
    pub user: Option<UserId>,

    /// Return tasks starting after this ID.
    pub after: Option<TaskId>,

    /// Size of each page. Zero picks the store's default page size.
    pub page_size: usize,
}

impl TaskSearchParams {
    pub fn for_org(org: OrgId) -> Self {
        Self {
            org: Some(org),
            ..Self::default()
        }
    }

    pub fn for_user(user: UserId) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn after(mut self, after: TaskId) -> Self {
        self.after = Some(after);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Does `task` pass the org/user filters? The cursor is not considered.
    pub(crate) fn matches(&self, task: &StoreTask) -> bool {
        if let Some(org) = self.org
            && org != task.org
        {
            return false;
        }
        if let Some(user) = self.user
            && user != task.user
        {
            return false;
        }
        true
    }
}
