//! Livestream scheduling and control endpoints.

use serde::{Deserialize, Serialize};

use edudash_api_types::livestreams::{
    Livestream, LivestreamStatus, LivestreamUpdate, NewLivestream,
};
use edudash_api_types::{ListQuery, Page};

use crate::cache::{Api, QueryClient, Tag, TagSource, acknowledged, payload};
use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::tags::{ANALYTICS, LIVESTREAM};
use super::{WithId, arg_id, entity_tags, list_tags, page_of};

pub const GET_LIVESTREAMS: &str = "getLivestreams";
pub const GET_LIVESTREAM: &str = "getLivestream";
pub const CREATE_LIVESTREAM: &str = "createLivestream";
pub const UPDATE_LIVESTREAM: &str = "updateLivestream";
pub const START_LIVESTREAM: &str = "startLivestream";
pub const END_LIVESTREAM: &str = "endLivestream";
pub const DELETE_LIVESTREAM: &str = "deleteLivestream";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivestreamListArgs {
    #[serde(flatten)]
    pub query: ListQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LivestreamStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
}

fn lifecycle_tags(args: &serde_json::Value) -> Vec<Tag> {
    let mut tags = entity_tags(LIVESTREAM, args);
    tags.push(Tag::kind(ANALYTICS));
    tags
}

pub(crate) fn register(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_LIVESTREAMS,
        |args: LivestreamListArgs| RequestDescriptor::get("livestreams").with_params(&args),
        page_of::<Livestream>("livestreams"),
        TagSource::dynamic(|_, result| list_tags(LIVESTREAM, result)),
    )?
    .define_query(
        GET_LIVESTREAM,
        |id: i64| Ok(RequestDescriptor::get(format!("livestreams/{id}"))),
        payload::<Livestream>(),
        TagSource::dynamic(|args, _| vec![Tag::id(LIVESTREAM, arg_id(args))]),
    )?
    .define_mutation(
        CREATE_LIVESTREAM,
        |stream: NewLivestream| RequestDescriptor::post("livestreams").with_body(&stream),
        payload::<Livestream>(),
        TagSource::fixed([Tag::list(LIVESTREAM)]),
    )?
    .define_mutation(
        UPDATE_LIVESTREAM,
        |args: WithId<LivestreamUpdate>| {
            RequestDescriptor::put(format!("livestreams/{}", args.id)).with_body(&args.body)
        },
        payload::<Livestream>(),
        TagSource::dynamic(|args, _| entity_tags(LIVESTREAM, args)),
    )?
    .define_mutation(
        START_LIVESTREAM,
        |id: i64| Ok(RequestDescriptor::post(format!("livestreams/{id}/start"))),
        payload::<Livestream>(),
        TagSource::dynamic(|args, _| lifecycle_tags(args)),
    )?
    .define_mutation(
        END_LIVESTREAM,
        |id: i64| Ok(RequestDescriptor::post(format!("livestreams/{id}/end"))),
        payload::<Livestream>(),
        TagSource::dynamic(|args, _| lifecycle_tags(args)),
    )?
    .define_mutation(
        DELETE_LIVESTREAM,
        |id: i64| Ok(RequestDescriptor::delete(format!("livestreams/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| lifecycle_tags(args)),
    )?;
    Ok(())
}

pub struct LivestreamsApi<'a> {
    client: &'a QueryClient,
}

impl<'a> LivestreamsApi<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &LivestreamListArgs) -> Result<Page<Livestream>, ApiError> {
        self.client.query_as(GET_LIVESTREAMS, args).await
    }

    pub async fn get(&self, id: i64) -> Result<Livestream, ApiError> {
        self.client.query_as(GET_LIVESTREAM, &id).await
    }

    pub async fn create(&self, stream: &NewLivestream) -> Result<Livestream, ApiError> {
        self.client.mutate_as(CREATE_LIVESTREAM, stream).await
    }

    pub async fn update(&self, id: i64, changes: LivestreamUpdate) -> Result<Livestream, ApiError> {
        self.client
            .mutate_as(UPDATE_LIVESTREAM, &WithId::new(id, changes))
            .await
    }

    pub async fn start(&self, id: i64) -> Result<Livestream, ApiError> {
        self.client.mutate_as(START_LIVESTREAM, &id).await
    }

    pub async fn end(&self, id: i64) -> Result<Livestream, ApiError> {
        self.client.mutate_as(END_LIVESTREAM, &id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_LIVESTREAM, &id).await.map(|_| ())
    }
}
