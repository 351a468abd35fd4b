//! Course catalogue endpoints.

use serde::{Deserialize, Serialize};
use serde_json::json;

use edudash_api_types::courses::{Course, CourseStats, CourseStatus, CourseUpdate, NewCourse};
use edudash_api_types::{ListQuery, Page};

use crate::cache::{
    Api, QueryClient, QueryOptions, QuerySubscription, Tag, TagSource, acknowledged, payload,
};
use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::tags::{ANALYTICS, COURSE, COURSE_STATS};
use super::{WithId, arg_id, entity_tags, list_tags, page_of};

pub const GET_COURSES: &str = "getCourses";
pub const GET_COURSE: &str = "getCourse";
pub const GET_COURSE_STATS: &str = "getCourseStats";
pub const CREATE_COURSE: &str = "createCourse";
pub const UPDATE_COURSE: &str = "updateCourse";
pub const UPDATE_COURSE_STATUS: &str = "updateCourseStatus";
pub const DELETE_COURSE: &str = "deleteCourse";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseListArgs {
    #[serde(flatten)]
    pub query: ListQuery,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl From<ListQuery> for CourseListArgs {
    fn from(query: ListQuery) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct StatusChange {
    pub id: i64,
    pub status: CourseStatus,
}

pub(crate) fn register(api: &mut Api) -> Result<(), RegistryError> {
    api.define_query(
        GET_COURSES,
        |args: CourseListArgs| RequestDescriptor::get("courses").with_params(&args),
        page_of::<Course>("courses"),
        TagSource::dynamic(|_, result| list_tags(COURSE, result)),
    )?
    .define_query(
        GET_COURSE,
        |id: i64| Ok(RequestDescriptor::get(format!("courses/{id}"))),
        payload::<Course>(),
        TagSource::dynamic(|args, _| vec![Tag::id(COURSE, arg_id(args))]),
    )?
    .define_query(
        GET_COURSE_STATS,
        |(): ()| Ok(RequestDescriptor::get("courses/stats")),
        payload::<CourseStats>(),
        TagSource::fixed([Tag::kind(COURSE_STATS)]),
    )?
    .define_mutation(
        CREATE_COURSE,
        |course: NewCourse| RequestDescriptor::post("courses").with_body(&course),
        payload::<Course>(),
        TagSource::fixed([
            Tag::list(COURSE),
            Tag::kind(COURSE_STATS),
            Tag::kind(ANALYTICS),
        ]),
    )?
    .define_mutation(
        UPDATE_COURSE,
        |args: WithId<CourseUpdate>| {
            RequestDescriptor::put(format!("courses/{}", args.id)).with_body(&args.body)
        },
        payload::<Course>(),
        TagSource::dynamic(|args, _| entity_tags(COURSE, args)),
    )?
    .define_mutation(
        UPDATE_COURSE_STATUS,
        |change: StatusChange| {
            RequestDescriptor::patch(format!("courses/{}/status", change.id))
                .with_body(&json!({ "status": change.status }))
        },
        payload::<Course>(),
        TagSource::dynamic(|args, _| {
            let mut tags = entity_tags(COURSE, args);
            tags.push(Tag::kind(COURSE_STATS));
            tags
        }),
    )?
    .define_mutation(
        DELETE_COURSE,
        |id: i64| Ok(RequestDescriptor::delete(format!("courses/{id}"))),
        acknowledged(),
        TagSource::dynamic(|args, _| {
            let mut tags = entity_tags(COURSE, args);
            tags.extend([Tag::kind(COURSE_STATS), Tag::kind(ANALYTICS)]);
            tags
        }),
    )?;
    Ok(())
}

pub struct CoursesApi<'a> {
    client: &'a QueryClient,
}

impl<'a> CoursesApi<'a> {
    pub fn new(client: &'a QueryClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, args: &CourseListArgs) -> Result<Page<Course>, ApiError> {
        self.client.query_as(GET_COURSES, args).await
    }

    /// Live view of one list page.
    pub fn watch_list(
        &self,
        args: &CourseListArgs,
        options: QueryOptions,
    ) -> Result<QuerySubscription, ApiError> {
        self.client.use_query(GET_COURSES, args, options)
    }

    pub async fn get(&self, id: i64) -> Result<Course, ApiError> {
        self.client.query_as(GET_COURSE, &id).await
    }

    pub async fn stats(&self) -> Result<CourseStats, ApiError> {
        self.client.query_as(GET_COURSE_STATS, &()).await
    }

    pub async fn create(&self, course: &NewCourse) -> Result<Course, ApiError> {
        self.client.mutate_as(CREATE_COURSE, course).await
    }

    pub async fn update(&self, id: i64, changes: CourseUpdate) -> Result<Course, ApiError> {
        self.client
            .mutate_as(UPDATE_COURSE, &WithId::new(id, changes))
            .await
    }

    pub async fn set_status(&self, id: i64, status: CourseStatus) -> Result<Course, ApiError> {
        self.client
            .mutate_as(UPDATE_COURSE_STATUS, &StatusChange { id, status })
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.client.mutate(DELETE_COURSE, &id).await.map(|_| ())
    }
}
