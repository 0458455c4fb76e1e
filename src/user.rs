//! Corporate directory lookups.

use crate::{
    endpoint::{USER_GET_ENDPOINT, USER_LIST_ENDPOINT},
    Client, Error, Payload, Result,
};
use serde::{Deserialize, Serialize};

/// A member of the corporate directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub open_user_id: String,
    pub name: String,
    pub nick_name: String,
    pub leader_id: String,
    pub position: String,
    pub email: String,
    pub department_ids: Vec<i64>,
    pub mobile: String,
    /// Unix time in milliseconds.
    pub create_time: i64,
}

impl Client {
    /// Lists the users of a department, optionally including its
    /// sub-departments.
    pub async fn list_users_by_department(
        &self,
        department_id: i64,
        fetch_child: bool,
    ) -> Result<Vec<User>> {
        let body = Payload::new()
            .with("departmentId", department_id)?
            .with("fetchChild", fetch_child)?;

        let raw = self.post(USER_LIST_ENDPOINT, Some(body), true).await?;

        #[derive(Deserialize)]
        struct UserList {
            #[serde(rename = "userList", default)]
            user_list: Vec<User>,
        }
        let list: UserList = serde_json::from_str(&raw)
            .map_err(|e| Error::decode(USER_LIST_ENDPOINT, raw.as_str(), e))?;
        Ok(list.user_list)
    }

    /// Fetches a user by open user id.
    pub async fn get_user_by_open_id(&self, open_user_id: &str) -> Result<User> {
        if open_user_id.is_empty() {
            return Err(Error::empty("openUserId"));
        }

        let body = Payload::new().with("openUserId", open_user_id)?;
        let raw = self.post(USER_GET_ENDPOINT, Some(body), true).await?;

        serde_json::from_str(&raw).map_err(|e| Error::decode(USER_GET_ENDPOINT, raw.as_str(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_tolerates_partial_records() {
        let user: User = serde_json::from_str(
            r#"{"errorCode":0,"openUserId":"FSUID_1","name":"Alice","departmentIds":[1000,1001]}"#,
        )
        .unwrap();

        assert_eq!(user.open_user_id, "FSUID_1");
        assert_eq!(user.name, "Alice");
        assert_eq!(user.department_ids, vec![1000, 1001]);
        assert!(user.email.is_empty());
    }
}
