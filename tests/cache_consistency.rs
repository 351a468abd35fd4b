//! End-to-end behaviour of the query cache against an in-memory backend:
//! de-duplication, tag invalidation, the staleness guard, retention and
//! the subscription options.

mod support;

use std::time::Duration;

use edudash::api::courses::{CourseListArgs, DELETE_COURSE, GET_COURSE, GET_COURSES};
use edudash::api::documents::GET_DOCUMENT;
use edudash::api::tags::COURSE;
use edudash::cache::{CacheConfig, QueryOptions, QueryStatus, RefetchOnMount, Tag};
use edudash::error::ApiError;
use edudash::types::courses::{Course, CourseStatus, NewCourse};
use edudash::types::{ListQuery, Page};

use support::FakeBackend;

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

fn first_page() -> CourseListArgs {
    CourseListArgs::from(ListQuery::page(1, 10))
}

#[tokio::test]
async fn concurrent_subscribers_share_one_request() {
    let backend = FakeBackend::seeded(3);
    backend.hold("GET courses/1");
    let client = backend.client(CacheConfig::default());

    let mut first = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    let mut second = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    assert!(first.state().is_loading());
    assert_eq!(client.stats().in_flight, 1);

    backend.release("GET courses/1", 1);
    let a = first.settled().await;
    let b = second.settled().await;

    assert!(a.is_success() && b.is_success());
    assert_eq!(a.data, b.data);
    assert_eq!(backend.calls("GET courses/1"), 1);
    assert_eq!(client.stats().subscribed, 1);
}

#[tokio::test]
async fn creating_a_course_refreshes_the_listing() {
    let backend = FakeBackend::seeded(57);
    let client = backend.client(CacheConfig::default());

    let mut listing = client
        .use_query(GET_COURSES, &first_page(), QueryOptions::default())
        .unwrap();
    let before = listing.settled().await;
    let page: Page<Course> = before.data_as().unwrap().unwrap();
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.pagination.total, 57);
    assert_eq!(page.pagination.total_pages, 6);
    assert_eq!(page.pagination.current_page, 1);
    assert_eq!(page.pagination.per_page, Some(10));

    let created = client
        .courses()
        .create(&NewCourse {
            title: "X".to_string(),
            teacher_id: Some(3),
            ..NewCourse::default()
        })
        .await
        .unwrap();
    assert_eq!(created.id, 58);

    let after = listing.settled().await;
    let page: Page<Course> = after.data_as().unwrap().unwrap();
    assert_eq!(page.pagination.total, 58);
    assert!(page.items.iter().any(|course| course.title == "X"));
    assert_eq!(backend.calls("GET courses"), 2);
}

#[tokio::test]
async fn created_course_reads_back_unchanged() {
    let backend = FakeBackend::seeded(57);
    let client = backend.client(CacheConfig::default());

    let input = NewCourse {
        title: "X".to_string(),
        description: Some("Intro to sets".to_string()),
        teacher_id: Some(3),
        category: Some("math".to_string()),
        price: Some(49.5),
        status: Some(CourseStatus::Draft),
    };
    let created = client.courses().create(&input).await.unwrap();
    let fetched = client.courses().get(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.title, input.title);
    assert_eq!(fetched.description, input.description);
    assert_eq!(fetched.teacher_id, input.teacher_id);
    assert_eq!(fetched.category, input.category);
    assert_eq!(fetched.price, input.price);
    assert_eq!(fetched.status, input.status);
    assert_eq!(backend.calls(&format!("GET courses/{}", created.id)), 1);
}

#[tokio::test]
async fn unsubscribed_listing_is_refetched_after_create() {
    let backend = FakeBackend::seeded(57);
    let client = backend.client(CacheConfig::default());

    let page = client.courses().list(&first_page()).await.unwrap();
    assert_eq!(page.pagination.total, 57);

    client
        .courses()
        .create(&NewCourse {
            title: "X".to_string(),
            teacher_id: Some(3),
            ..NewCourse::default()
        })
        .await
        .unwrap();
    assert!(client.snapshot(GET_COURSES, &first_page()).is_none());

    let page = client.courses().list(&first_page()).await.unwrap();
    assert_eq!(page.pagination.total, 58);
    assert_eq!(page.items[0].title, "X");
}

#[tokio::test]
async fn deleted_document_is_not_served_from_cache() {
    let backend = FakeBackend::seeded(1);
    let client = backend.client(CacheConfig::default());

    let document = client.documents().get(42).await.unwrap();
    assert_eq!(document.title, "Slides");

    client.documents().delete(42).await.unwrap();
    let err = client.documents().get(42).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), "Document not found");
}

#[tokio::test]
async fn subscribed_document_turns_into_error_after_delete() {
    let backend = FakeBackend::seeded(1);
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(GET_DOCUMENT, &42_i64, QueryOptions::default())
        .unwrap();
    assert!(detail.settled().await.is_success());

    client.documents().delete(42).await.unwrap();
    let state = detail.settled().await;

    assert_eq!(state.status, QueryStatus::Error);
    assert!(state.data.is_none());
    assert_eq!(state.error.and_then(|err| err.status()), Some(404));
}

#[tokio::test]
async fn invalidation_purges_unsubscribed_entries() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    client.courses().get(1).await.unwrap();
    client.courses().get(2).await.unwrap();

    let affected = client.invalidate_tags(&[Tag::id(COURSE, 1)]);
    assert_eq!(affected, 1);
    assert!(client.snapshot(GET_COURSE, &1_i64).is_none());
    assert!(client.snapshot(GET_COURSE, &2_i64).is_some());

    assert_eq!(client.invalidate_tags(&[Tag::kind(COURSE)]), 1);
    assert_eq!(client.stats().entries, 0);
    assert_eq!(client.stats().registered_tags, 0);
}

#[tokio::test]
async fn item_tags_reach_the_listing_that_contains_them() {
    let backend = FakeBackend::seeded(12);
    let client = backend.client(CacheConfig::default());

    let mut listing = client
        .use_query(GET_COURSES, &first_page(), QueryOptions::default())
        .unwrap();
    listing.settled().await;

    assert_eq!(client.invalidate_tags(&[Tag::id(COURSE, 1)]), 0);
    assert_eq!(client.invalidate_tags(&[Tag::id(COURSE, 12)]), 1);
    assert!(listing.settled().await.is_success());
    assert_eq!(backend.calls("GET courses"), 2);
}

#[tokio::test]
async fn invalidation_reaches_a_first_load_still_in_flight() {
    let backend = FakeBackend::seeded(57);
    backend.hold("GET courses");
    let client = backend.client(CacheConfig::default());

    let mut listing = client
        .use_query(GET_COURSES, &first_page(), QueryOptions::default())
        .unwrap();
    client
        .courses()
        .create(&NewCourse {
            title: "X".to_string(),
            ..NewCourse::default()
        })
        .await
        .unwrap();
    assert_eq!(client.stats().in_flight, 2);

    backend.release("GET courses", 2);
    let state = listing.settled().await;
    let page: Page<Course> = state.data_as().unwrap().unwrap();

    assert_eq!(page.pagination.total, 58);
    assert_eq!(client.stats().in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn late_response_never_overwrites_a_newer_one() {
    let backend = FakeBackend::seeded(3);
    backend.delay_next("GET courses/1", Duration::from_millis(100));
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    while backend.calls("GET courses/1") == 0 {
        tokio::task::yield_now().await;
    }

    backend.rename_course(1, "Renamed");
    assert_eq!(client.invalidate_tags(&[Tag::id(COURSE, 1)]), 1);

    let state = detail.settled().await;
    let course: Course = state.data_as().unwrap().unwrap();
    assert_eq!(course.title, "Renamed");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let course: Course = detail.data_as().unwrap().unwrap();
    assert_eq!(course.title, "Renamed");
    assert_eq!(client.stats().in_flight, 0);
    assert_eq!(backend.calls("GET courses/1"), 2);
}

#[tokio::test]
async fn response_without_subscribers_is_discarded() {
    let backend = FakeBackend::seeded(3);
    backend.hold("GET courses/1");
    let client = backend.client(CacheConfig::default());

    let subscription = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    drop(subscription);
    backend.release("GET courses/1", 1);

    eventually(|| client.stats().in_flight == 0).await;
    assert_eq!(client.stats().discarded_responses, 1);
    let state = client.snapshot(GET_COURSE, &1_i64).unwrap();
    assert!(state.data.is_none());
    assert!(!state.is_fetching);
}

#[tokio::test]
async fn abort_on_unsubscribe_cancels_the_request() {
    let backend = FakeBackend::seeded(3);
    backend.hold("GET courses/1");
    let client = backend.client(CacheConfig {
        abort_on_unsubscribe: true,
        ..CacheConfig::default()
    });

    let subscription = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    drop(subscription);
    assert_eq!(client.stats().in_flight, 0);

    backend.release("GET courses/1", 1);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(client.stats().discarded_responses, 0);

    // A new subscriber starts over instead of waiting on the cancelled request.
    let mut again = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    assert!(again.settled().await.is_success());
}

#[tokio::test]
async fn skipped_queries_never_fetch() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    let mut skipped = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::skipped())
        .unwrap();

    assert!(skipped.is_skipped());
    assert_eq!(skipped.settled().await.status, QueryStatus::Uninitialized);
    assert_eq!(skipped.refetch().await.status, QueryStatus::Uninitialized);
    assert_eq!(backend.total_calls(), 0);
    assert_eq!(client.stats().entries, 0);
}

#[tokio::test(start_paused = true)]
async fn polling_refetches_while_subscribed() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(
            GET_COURSE,
            &1_i64,
            QueryOptions::polling(Duration::from_secs(30)),
        )
        .unwrap();
    detail.settled().await;

    tokio::time::sleep(Duration::from_secs(95)).await;
    assert_eq!(backend.calls("GET courses/1"), 4);

    drop(detail);
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(backend.calls("GET courses/1"), 4);
}

#[tokio::test(start_paused = true)]
async fn unused_entries_expire_after_retention() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig {
        keep_unused_for: Duration::from_secs(60),
        ..CacheConfig::default()
    });

    client.courses().get(1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(client.snapshot(GET_COURSE, &1_i64).is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(client.snapshot(GET_COURSE, &1_i64).is_none());
    assert_eq!(client.stats().registered_tags, 0);
}

#[tokio::test(start_paused = true)]
async fn resubscribing_cancels_expiry() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig {
        keep_unused_for: Duration::from_secs(60),
        ..CacheConfig::default()
    });

    client.courses().get(1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let held = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(client.snapshot(GET_COURSE, &1_i64).is_some());
    assert_eq!(backend.calls("GET courses/1"), 1);

    drop(held);
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(client.snapshot(GET_COURSE, &1_i64).is_none());
}

#[test]
fn collect_garbage_drops_entries_left_without_a_timer() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig {
        keep_unused_for: Duration::ZERO,
        ..CacheConfig::default()
    });

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let held = runtime.block_on(async {
        let mut held = client
            .use_query(GET_COURSE, &2_i64, QueryOptions::default())
            .unwrap();
        held.settled().await;
        held
    });
    drop(runtime);

    assert_eq!(client.collect_garbage(), 0);

    // Released outside a runtime, so no retention timer is armed.
    drop(held);
    assert_eq!(client.stats().entries, 1);
    assert_eq!(client.collect_garbage(), 1);
    assert_eq!(client.stats().entries, 0);
}

#[tokio::test(start_paused = true)]
async fn refetch_on_mount_follows_policy() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    client.courses().get(1).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let mount = |policy: Option<RefetchOnMount>| {
        let options = match policy {
            Some(policy) => QueryOptions::default().with_refetch_on_mount(policy),
            None => QueryOptions::default(),
        };
        client.use_query(GET_COURSE, &1_i64, options).unwrap()
    };

    mount(None).settled().await;
    assert_eq!(backend.calls("GET courses/1"), 1);

    mount(Some(RefetchOnMount::IfOlderThan(Duration::from_secs(60))))
        .settled()
        .await;
    assert_eq!(backend.calls("GET courses/1"), 1);

    mount(Some(RefetchOnMount::IfOlderThan(Duration::from_secs(3))))
        .settled()
        .await;
    assert_eq!(backend.calls("GET courses/1"), 2);

    let mut always = mount(Some(RefetchOnMount::Always));
    // Cached data stays visible while the refetch runs.
    assert!(always.state().data.is_some());
    always.settled().await;
    assert_eq!(backend.calls("GET courses/1"), 3);
}

#[tokio::test]
async fn errors_clear_previous_data() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    assert!(detail.settled().await.is_success());

    backend.fail_next("GET courses/1", 503, "maintenance");
    let state = detail.refetch().await;
    assert!(state.is_error());
    assert!(state.data.is_none());
    assert_eq!(state.error.as_ref().map(ApiError::message).as_deref(), Some("maintenance"));

    let state = detail.refetch().await;
    assert!(state.is_success());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn refetch_without_changes_yields_same_data() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(GET_COURSE, &2_i64, QueryOptions::default())
        .unwrap();
    let first = detail.settled().await;
    let second = detail.refetch().await;
    let third = detail.refetch().await;

    assert_eq!(first.data, second.data);
    assert_eq!(second.data, third.data);
    assert_eq!(backend.calls("GET courses/2"), 3);
}

#[tokio::test]
async fn reset_clears_cache_and_refetches_subscribers() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    detail.settled().await;
    client.courses().get(2).await.unwrap();

    client.reset();
    assert!(client.snapshot(GET_COURSE, &2_i64).is_none());

    assert!(detail.settled().await.is_success());
    assert_eq!(backend.calls("GET courses/1"), 2);
    assert_eq!(client.stats().entries, 1);
}

#[tokio::test]
async fn mutation_handle_reports_outcome() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());
    let handle = client.use_mutation(DELETE_COURSE).unwrap();

    handle.trigger(&3_i64).await.unwrap();
    assert!(!handle.is_loading());
    assert!(handle.error().is_none());
    assert_eq!(backend.course_total(), 2);

    let err = handle.trigger(&99_i64).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(handle.error().and_then(|err| err.status()), Some(404));
}

#[tokio::test]
async fn failed_mutation_invalidates_nothing() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    let mut detail = client
        .use_query(GET_COURSE, &1_i64, QueryOptions::default())
        .unwrap();
    detail.settled().await;

    backend.fail_next("DELETE courses/1", 500, "database unavailable");
    let err = client.courses().delete(1).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(backend.calls("GET courses/1"), 1);
}

#[tokio::test]
async fn dispatch_errors_are_returned_immediately() {
    let backend = FakeBackend::seeded(3);
    let client = backend.client(CacheConfig::default());

    assert!(matches!(
        client.use_query("getNothing", &(), QueryOptions::default()),
        Err(ApiError::UnknownEndpoint { .. })
    ));
    assert!(matches!(
        client.use_query(DELETE_COURSE, &1_i64, QueryOptions::default()),
        Err(ApiError::WrongKind { .. })
    ));
    assert!(matches!(
        client.use_mutation(GET_COURSE),
        Err(ApiError::WrongKind { .. })
    ));
    assert!(matches!(
        client.use_query(GET_COURSE, "one", QueryOptions::default()),
        Err(ApiError::InvalidArgs { .. })
    ));
    assert_eq!(backend.total_calls(), 0);
}
