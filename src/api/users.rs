//! Account management endpoints.

use serde::{Deserialize, Serialize};
use serde_json::json;

use edudash_api_types::users::{NewUser, User, UserRole, UserStats, UserUpdate};
use edudash_api_types::{ListQuery, Page};

use crate::cache::{Api, QueryClient, Tag, TagSource, acknowledged, payload};
use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::tags::{ANALYTICS, USER, USER_STATS};
use super::{WithId, arg_id, entity_tags, list_tags, page_of};

pub const GET_USERS: &str = "getUsers";
pub const GET_USER: &str = "getUser";
pub const GET_USER_STATS: &str = "getUserStats";
pub const CREATE_USER: &str = "createUser";
pub const UPDATE_USER: &str = "updateUser";
pub const SET_USER_ACTIVE: &str = "setUserActive";
pub const DELETE_USER: &str = "deleteUser";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListArgs {
    #[serde(flatten)]
    pub query: ListQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveChange {
    pub id: i64,
    pub is_active: bool,
}

/// Writes that change who exists or what role they hold move the counters.
fn account_tags(args: &serde_json::Value) -> Vec<Tag> {
    let mut tags = entity_tags(USER, args);
    tags.extend([Tag::kind(USER_STATS), Tag::kind(ANALYTICS)]);
    tags
}

pub(crate) fn register(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_USERS,
        |args: UserListArgs| RequestDescriptor::get("users").with_params(&args),
        page_of::<User>("users"),
        TagSource::dynamic(|_, result| list_tags(USER, result)),
    )?
    .define_query(
        GET_USER,
        |id: i64| Ok(RequestDescriptor::get(format!("users/{id}"))),
        payload::<User>(),
        TagSource::dynamic(|args, _| vec![Tag::id(USER, arg_id(args))]),
    )?
    .define_query(
        GET_USER_STATS,
        |(): ()| Ok(RequestDescriptor::get("users/stats")),
        payload::<UserStats>(),
        TagSource::fixed([Tag::kind(USER_STATS)]),
    )?
    .define_mutation(
        CREATE_USER,
        |user: NewUser| RequestDescriptor::post("users").with_body(&user),
        payload::<User>(),
        TagSource::fixed([
            Tag::list(USER),
            Tag::kind(USER_STATS),
            Tag::kind(ANALYTICS),
        ]),
    )?
    .define_mutation(
        UPDATE_USER,
        |args: WithId<UserUpdate>| {
            RequestDescriptor::put(format!("users/{}", args.id)).with_body(&args.body)
        },
        payload::<User>(),
        TagSource::dynamic(|args, _| account_tags(args)),
    )?
    .define_mutation(
        SET_USER_ACTIVE,
        |change: ActiveChange| {
            RequestDescriptor::patch(format!("users/{}/status", change.id))
                .with_body(&json!({ "isActive": change.is_active }))
        },
        payload::<User>(),
        TagSource::dynamic(|args, _| account_tags(args)),
    )?
    .define_mutation(
        DELETE_USER,
        |id: i64| Ok(RequestDescriptor::delete(format!("users/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| account_tags(args)),
    )?;
    Ok(())
}

pub struct UsersApi<'a> {
    client: &'a QueryClient,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &UserListArgs) -> Result<Page<User>, ApiError> {
        self.client.query_as(GET_USERS, args).await
    }

    pub async fn get(&self, id: i64) -> Result<User, ApiError> {
        self.client.query_as(GET_USER, &id).await
    }

    pub async fn stats(&self) -> Result<UserStats, ApiError> {
        self.client.query_as(GET_USER_STATS, &()).await
    }

    pub async fn create(&self, user: &NewUser) -> Result<User, ApiError> {
        self.client.mutate_as(CREATE_USER, user).await
    }

    pub async fn update(&self, id: i64, changes: UserUpdate) -> Result<User, ApiError> {
        self.client
            .mutate_as(UPDATE_USER, &WithId::new(id, changes))
            .await
    }

    pub async fn set_active(&self, id: i64, is_active: bool) -> Result<User, ApiError> {
        self.client
            .mutate_as(SET_USER_ACTIVE, &ActiveChange { id, is_active })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_USER, &id).await.map(|_| ())
    }
}
