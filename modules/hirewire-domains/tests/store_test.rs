//! Persistence-layer tests against a real Postgres.
//!
//! **Requires:** `DATABASE_URL` pointing at a scratch database; migrations
//! run automatically. Ignored by default.
//!
//! Run with: cargo test -p hirewire-domains --test store_test -- --ignored

use sqlx::PgPool;
use uuid::Uuid;

use hirewire_common::{Error, Role};
use hirewire_domains::jobs::application::Application;
use hirewire_domains::jobs::{Job, NewJob};
use hirewire_domains::posts::engagement::{self, Comment};
use hirewire_domains::posts::{Post, PostImage};
use hirewire_domains::social::Follow;
use hirewire_domains::users::otp::EmailOtp;
use hirewire_domains::users::User;

async fn setup() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&url).await.expect("connect failed");
    hirewire_domains::migrate(&pool).await.expect("migration failed");
    pool
}

async fn make_user(role: Role, pool: &PgPool) -> User {
    let email = format!("{}@test.example", Uuid::new_v4());
    let user = User::create(&email, "unused-hash", "Test", "User", role, pool)
        .await
        .expect("create user");
    User::mark_verified(&user.email, pool).await.expect("verify")
}

async fn true_counts(post_id: Uuid, pool: &PgPool) -> (i64, i64) {
    let (likes,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(pool)
            .await
            .unwrap();
    let (comments,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM post_comments WHERE post_id = $1 AND is_active")
            .bind(post_id)
            .fetch_one(pool)
            .await
            .unwrap();
    (likes, comments)
}

#[tokio::test]
#[ignore]
async fn counters_converge_with_edge_rows() {
    let pool = setup().await;
    let author = make_user(Role::Employer, &pool).await;
    let viewer = make_user(Role::Employee, &pool).await;
    let other = make_user(Role::Company, &pool).await;

    let post = Post::create(author.id, "counter convergence", &[], &pool)
        .await
        .unwrap();

    engagement::like(post.id, &viewer, &pool).await.unwrap();
    engagement::like(post.id, &other, &pool).await.unwrap();
    let c1 = Comment::create(&post, &viewer, "first", &pool).await.unwrap();
    Comment::create(&post, &other, "second", &pool).await.unwrap();
    engagement::unlike(post.id, other.id, &pool).await.unwrap();
    Comment::soft_delete(c1.id, &pool).await.unwrap();

    let fresh = Post::find_active(post.id, &pool).await.unwrap();
    let (likes, comments) = true_counts(post.id, &pool).await;
    assert_eq!(fresh.likes_count as i64, likes);
    assert_eq!(fresh.comments_count as i64, comments);
    assert_eq!(likes, 1);
    assert_eq!(comments, 1);
}

#[tokio::test]
#[ignore]
async fn duplicate_like_is_conflict_with_current_count() {
    let pool = setup().await;
    let author = make_user(Role::Employer, &pool).await;
    let viewer = make_user(Role::Employee, &pool).await;

    let post = Post::create(author.id, "double click", &[], &pool)
        .await
        .unwrap();

    let count = engagement::like(post.id, &viewer, &pool).await.unwrap();
    assert_eq!(count, 1);

    match engagement::like(post.id, &viewer, &pool).await {
        Err(Error::AlreadyLiked { likes_count }) => assert_eq!(likes_count, 1),
        other => panic!("expected AlreadyLiked, got {other:?}"),
    }

    // The duplicate must not have bumped the counter.
    let fresh = Post::find_active(post.id, &pool).await.unwrap();
    assert_eq!(fresh.likes_count, 1);
}

#[tokio::test]
#[ignore]
async fn unlike_without_like_reports_not_liked() {
    let pool = setup().await;
    let author = make_user(Role::Employer, &pool).await;
    let viewer = make_user(Role::Employee, &pool).await;

    let post = Post::create(author.id, "never liked", &[], &pool)
        .await
        .unwrap();

    match engagement::unlike(post.id, viewer.id, &pool).await {
        Err(Error::NotLiked { likes_count }) => assert_eq!(likes_count, 0),
        other => panic!("expected NotLiked, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn image_delete_recompacts_order() {
    let pool = setup().await;
    let author = make_user(Role::Employee, &pool).await;

    let urls: Vec<String> = (1..=4).map(|i| format!("/media/posts/{i}.png")).collect();
    let post = Post::create(author.id, "gallery", &urls, &pool).await.unwrap();

    let images = PostImage::for_post(post.id, &pool).await.unwrap();
    assert_eq!(
        images.iter().map(|i| i.ord).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    // Delete the second image; the rest shift down to stay contiguous.
    PostImage::delete(post.id, images[1].id, &pool).await.unwrap();

    let after = PostImage::for_post(post.id, &pool).await.unwrap();
    assert_eq!(after.len(), 3);
    assert_eq!(after.iter().map(|i| i.ord).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(after[0].url, "/media/posts/1.png");
    assert_eq!(after[1].url, "/media/posts/3.png");
    assert_eq!(after[2].url, "/media/posts/4.png");
}

#[tokio::test]
#[ignore]
async fn image_append_continues_from_max_order() {
    let pool = setup().await;
    let author = make_user(Role::Employee, &pool).await;

    let post = Post::create(
        author.id,
        "append",
        &["/media/posts/a.png".to_string()],
        &pool,
    )
    .await
    .unwrap();

    let added = PostImage::add(post.id, &["/media/posts/b.png".to_string()], &pool)
        .await
        .unwrap();
    assert_eq!(added[0].ord, 2);
}

#[tokio::test]
#[ignore]
async fn share_skips_duplicates_and_counts_new_rows_only() {
    let pool = setup().await;
    let author = make_user(Role::Employer, &pool).await;
    let sender = make_user(Role::Employee, &pool).await;
    let a = make_user(Role::Company, &pool).await;
    let b = make_user(Role::Employer, &pool).await;

    let post = Post::create(author.id, "worth sharing", &[], &pool)
        .await
        .unwrap();

    // Recipient list with an in-request duplicate: only two rows land.
    let shared = engagement::share(&post, &sender, &[a.id, b.id, a.id], &pool)
        .await
        .unwrap();
    assert_eq!(shared, 2);

    // Re-sharing to the same recipients creates nothing new.
    let again = engagement::share(&post, &sender, &[a.id, b.id], &pool)
        .await
        .unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
#[ignore]
async fn share_drops_the_sender_from_recipients() {
    let pool = setup().await;
    let author = make_user(Role::Employer, &pool).await;
    let sender = make_user(Role::Employee, &pool).await;
    let friend = make_user(Role::Company, &pool).await;

    let post = Post::create(author.id, "no self-shares", &[], &pool)
        .await
        .unwrap();

    // The sender in the list is ignored; only the friend counts.
    let shared = engagement::share(&post, &sender, &[sender.id, friend.id], &pool)
        .await
        .unwrap();
    assert_eq!(shared, 1);

    // A list that reduces to nobody is a validation error.
    assert!(matches!(
        engagement::share(&post, &sender, &[sender.id], &pool).await,
        Err(Error::Validation(_))
    ));
}

#[tokio::test]
#[ignore]
async fn follow_rules_and_duplicate_requests() {
    let pool = setup().await;
    let employee = make_user(Role::Employee, &pool).await;
    let employee2 = make_user(Role::Employee, &pool).await;
    let employer = make_user(Role::Employer, &pool).await;
    let company = make_user(Role::Company, &pool).await;

    assert!(matches!(
        Follow::request(&employee, &employee, &pool).await,
        Err(Error::SelfFollow)
    ));
    assert!(matches!(
        Follow::request(&employee, &employee2, &pool).await,
        Err(Error::FollowRoleViolation(_))
    ));
    assert!(matches!(
        Follow::request(&company, &employer, &pool).await,
        Err(Error::FollowRoleViolation(_))
    ));

    let edge = Follow::request(&employee, &employer, &pool).await.unwrap();
    assert_eq!(edge.status, "pending");

    // Any existing edge blocks a second request, whatever its status.
    assert!(matches!(
        Follow::request(&employee, &employer, &pool).await,
        Err(Error::AlreadyFollowing)
    ));

    let accepted = Follow::respond(employer.id, employee.id, true, &pool)
        .await
        .unwrap();
    assert_eq!(accepted.status, "accepted");

    // Still blocked after acceptance.
    assert!(matches!(
        Follow::request(&employee, &employer, &pool).await,
        Err(Error::AlreadyFollowing)
    ));

    // After unfollow the pair is free again.
    Follow::unfollow(employee.id, employer.id, &pool).await.unwrap();
    Follow::request(&employee, &employer, &pool).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn apply_twice_is_rejected_and_counter_is_single() {
    let pool = setup().await;
    let publisher = make_user(Role::Employer, &pool).await;
    let applicant = make_user(Role::Employee, &pool).await;

    let job = Job::create(
        &publisher,
        &NewJob {
            title: "Backend Engineer".into(),
            description: "Build the backend.".into(),
            ..Default::default()
        },
        &pool,
    )
    .await
    .unwrap();

    assert!(matches!(
        Application::apply(&job, publisher.id, "/media/resumes/r.pdf", "me", &pool).await,
        Err(Error::SelfApplication)
    ));

    Application::apply(&job, applicant.id, "/media/resumes/r.pdf", "hire me", &pool)
        .await
        .unwrap();
    assert!(matches!(
        Application::apply(&job, applicant.id, "/media/resumes/r.pdf", "again", &pool).await,
        Err(Error::AlreadyApplied)
    ));

    let fresh = Job::find_active(job.id, &pool).await.unwrap();
    assert_eq!(fresh.applications_count, 1);
}

#[tokio::test]
#[ignore]
async fn job_creation_broadcasts_to_everyone_else() {
    let pool = setup().await;
    let publisher = make_user(Role::Company, &pool).await;
    let bystander = make_user(Role::Employee, &pool).await;

    let before =
        hirewire_domains::notifications::Notification::unread_count(bystander.id, &pool)
            .await
            .unwrap();

    Job::create(
        &publisher,
        &NewJob {
            title: "Designer".into(),
            description: "Design things.".into(),
            ..Default::default()
        },
        &pool,
    )
    .await
    .unwrap();

    let after =
        hirewire_domains::notifications::Notification::unread_count(bystander.id, &pool)
            .await
            .unwrap();
    assert_eq!(after, before + 1);

    // The publisher never notifies themselves.
    let own = hirewire_domains::notifications::Notification::list_for(publisher.id, &pool)
        .await
        .unwrap();
    assert!(own.iter().all(|n| n.notification_type != "job"));
}

#[tokio::test]
#[ignore]
async fn registration_flow_end_to_end() {
    let pool = setup().await;
    let email = format!("{}@test.example", Uuid::new_v4());

    let user = User::create(&email, "hash", "End", "ToEnd", Role::Employee, &pool)
        .await
        .unwrap();
    assert!(!user.is_active);
    assert!(!user.email_verified);

    let otp = EmailOtp::issue(&email, &pool).await.unwrap();
    EmailOtp::verify_and_consume(&email, &otp.code, &pool)
        .await
        .unwrap();
    let user = User::mark_verified(&email, &pool).await.unwrap();
    assert!(user.is_active && user.email_verified);

    // A consumed code cannot be replayed.
    assert!(EmailOtp::verify_and_consume(&email, &otp.code, &pool)
        .await
        .is_err());

    // Verified account goes on to post, get liked, and clean up.
    let author = make_user(Role::Employer, &pool).await;
    let urls = vec![
        "/media/posts/one.png".to_string(),
        "/media/posts/two.png".to_string(),
    ];
    let post = Post::create(author.id, "hello world", &urls, &pool)
        .await
        .unwrap();
    assert_eq!(PostImage::for_post(post.id, &pool).await.unwrap().len(), 2);

    engagement::like(post.id, &user, &pool).await.unwrap();
    let comment = Comment::create(&post, &user, "welcome", &pool).await.unwrap();

    let fresh = Post::find_active(post.id, &pool).await.unwrap();
    assert_eq!(fresh.likes_count, 1);
    assert_eq!(fresh.comments_count, 1);

    let count_after_delete = Comment::soft_delete(comment.id, &pool).await.unwrap();
    assert_eq!(count_after_delete, 0);
    Post::soft_delete(post.id, &pool).await.unwrap();

    assert!(matches!(
        Post::find_active(post.id, &pool).await,
        Err(Error::NotFound("post"))
    ));
}
