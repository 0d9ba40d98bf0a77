//! Post feed, image management, and engagement endpoints.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use uuid::Uuid;

use hirewire_common::Error;
use hirewire_domains::posts::engagement::{self, Comment};
use hirewire_domains::posts::{
    validate_description, validate_image, Post, PostImage, PostQuery, MAX_IMAGES_PER_POST,
};
use hirewire_domains::{allows, Action, Actor};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Deserialize)]
pub struct PostListQuery {
    search: Option<String>,
    author: Option<Uuid>,
    limit: Option<i64>,
    offset: Option<i64>,
}

fn post_json(post: &Post, images: &[PostImage], liked: bool, viewer_id: Uuid) -> serde_json::Value {
    serde_json::json!({
        "id": post.id,
        "author_id": post.author_id,
        "description": post.description,
        "likes_count": post.likes_count,
        "comments_count": post.comments_count,
        "created_at": post.created_at,
        "updated_at": post.updated_at,
        "images": images,
        "liked": liked,
        "is_owner": post.author_id == viewer_id,
    })
}

/// Reject a whole post form up front; nothing is written to the media
/// store until every field and file has passed.
fn validate_post_form(
    description: Option<&str>,
    files: &[super::UploadedFile],
) -> Result<(), Error> {
    if let Some(description) = description {
        validate_description(description)?;
    }
    if files.len() > MAX_IMAGES_PER_POST {
        return Err(Error::ImageLimit(MAX_IMAGES_PER_POST));
    }
    for file in files {
        validate_image(&file.content_type, file.bytes.len())?;
    }
    Ok(())
}

pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(params): Query<PostListQuery>,
) -> ApiResult<impl IntoResponse> {
    let query = PostQuery {
        search: params.search,
        author_id: params.author,
        limit: params.limit,
        offset: params.offset,
    };

    let posts = Post::list(&query, &state.pool).await?;
    let total = Post::count(&query, &state.pool).await?;

    let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
    let images = PostImage::for_posts(&post_ids, &state.pool).await?;
    let liked_ids = engagement::liked_post_ids(user.id, &post_ids, &state.pool).await?;

    let results: Vec<serde_json::Value> = posts
        .iter()
        .map(|post| {
            let post_images: Vec<PostImage> = images
                .iter()
                .filter(|img| img.post_id == post.id)
                .cloned()
                .collect();
            post_json(post, &post_images, liked_ids.contains(&post.id), user.id)
        })
        .collect();

    Ok(super::listing(total, results))
}

/// Create a post from a multipart form: a `description` field plus zero or
/// more image parts. Every image is validated before any blob is written.
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = super::read_multipart(multipart).await?;
    let description = form
        .fields
        .get("description")
        .ok_or_else(|| Error::validation("description is required"))?;

    // Everything is validated before any blob lands on disk, so a rejected
    // request leaves no orphaned files.
    validate_post_form(Some(description.as_str()), &form.files)?;

    let mut urls = Vec::with_capacity(form.files.len());
    for file in &form.files {
        urls.push(
            state
                .media
                .store("posts", &file.content_type, &file.bytes)
                .await?,
        );
    }

    let post = Post::create(user.id, description, &urls, &state.pool).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "detail": "Post created.",
            "post": post,
        })),
    ))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = Post::find_active(id, &state.pool).await?;
    let images = PostImage::for_post(id, &state.pool).await?;
    let liked = engagement::has_liked(user.id, id, &state.pool).await?;
    Ok(Json(post_json(&post, &images, liked, user.id)))
}

/// Update a post from a multipart form: an optional `description` field,
/// and optional image parts that replace the whole image set.
pub async fn update_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut post = Post::find_active(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyPost {
            author_id: post.author_id,
        },
    ) {
        return Err(Error::Permission("only the author can modify this post").into());
    }

    let form = super::read_multipart(multipart).await?;
    let description = form.fields.get("description");
    if description.is_none() && form.files.is_empty() {
        return Err(Error::validation("nothing to update").into());
    }

    validate_post_form(description.map(String::as_str), &form.files)?;

    if let Some(description) = description {
        post = Post::update_description(id, description, &state.pool).await?;
    }

    if !form.files.is_empty() {
        let mut urls = Vec::with_capacity(form.files.len());
        for file in &form.files {
            urls.push(
                state
                    .media
                    .store("posts", &file.content_type, &file.bytes)
                    .await?,
            );
        }
        PostImage::replace(id, &urls, &state.pool).await?;
    }

    let images = PostImage::for_post(id, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Post updated.",
        "post": post,
        "images": images,
    })))
}

pub async fn delete_post(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let post = Post::find_active(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyPost {
            author_id: post.author_id,
        },
    ) {
        return Err(Error::Permission("only the author can delete this post").into());
    }

    Post::soft_delete(id, &state.pool).await?;
    Ok(super::detail("Post deleted."))
}

pub async fn add_images(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let post = Post::find_active(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyPost {
            author_id: post.author_id,
        },
    ) {
        return Err(Error::Permission("only the author can modify this post").into());
    }

    let form = super::read_multipart(multipart).await?;
    if form.files.is_empty() {
        return Err(Error::validation("at least one image is required").into());
    }
    for file in &form.files {
        validate_image(&file.content_type, file.bytes.len())?;
    }

    let mut urls = Vec::with_capacity(form.files.len());
    for file in &form.files {
        urls.push(
            state
                .media
                .store("posts", &file.content_type, &file.bytes)
                .await?,
        );
    }

    let images = PostImage::add(id, &urls, &state.pool).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "detail": "Images added.",
            "images": images,
        })),
    ))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, img_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<impl IntoResponse> {
    let post = Post::find_active(id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::ModifyPost {
            author_id: post.author_id,
        },
    ) {
        return Err(Error::Permission("only the author can modify this post").into());
    }

    PostImage::delete(id, img_id, &state.pool).await?;
    Ok(super::detail("Image deleted."))
}

pub async fn like(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let likes_count = engagement::like(id, &user, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Post liked.",
        "likes_count": likes_count,
        "liked": true,
    })))
}

pub async fn unlike(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let likes_count = engagement::unlike(id, user.id, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Post unliked.",
        "likes_count": likes_count,
        "liked": false,
    })))
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    AuthUser(_user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Post::find_active(id, &state.pool).await?;
    let comments = Comment::list_for_post(id, &state.pool).await?;
    let total = comments.len() as i64;
    Ok(super::listing(total, comments))
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    text: String,
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = Post::find_active(id, &state.pool).await?;
    let comment = Comment::create(&post, &user, &body.text, &state.pool).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "detail": "Comment added.",
            "comment": comment,
        })),
    ))
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let comment = Comment::find_active(id, &state.pool).await?;
    let post = Post::find_any(comment.post_id, &state.pool).await?;
    if !allows(
        Actor::from(&user),
        Action::DeleteComment {
            comment_author_id: comment.user_id,
            post_author_id: post.author_id,
        },
    ) {
        return Err(Error::Permission("not allowed to delete this comment").into());
    }

    let comments_count = Comment::soft_delete(id, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Comment deleted.",
        "comments_count": comments_count,
    })))
}

#[derive(Deserialize)]
pub struct ShareRequest {
    recipient_ids: Vec<Uuid>,
}

pub async fn share(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ShareRequest>,
) -> ApiResult<impl IntoResponse> {
    let post = Post::find_active(id, &state.pool).await?;
    let shared_count = engagement::share(&post, &user, &body.recipient_ids, &state.pool).await?;
    Ok(Json(serde_json::json!({
        "detail": "Post shared.",
        "shared_count": shared_count,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::UploadedFile;

    fn image(bytes: usize) -> UploadedFile {
        UploadedFile {
            field: "image".into(),
            content_type: "image/png".into(),
            bytes: vec![0; bytes],
        }
    }

    #[test]
    fn form_validation_happens_before_any_blob_is_stored() {
        let too_many: Vec<UploadedFile> = (0..=MAX_IMAGES_PER_POST).map(|_| image(16)).collect();
        assert!(matches!(
            validate_post_form(Some("ok"), &too_many),
            Err(Error::ImageLimit(_))
        ));

        let long = "x".repeat(2001);
        assert!(matches!(
            validate_post_form(Some(&long), &[image(16)]),
            Err(Error::Validation(_))
        ));

        let pdf = UploadedFile {
            field: "image".into(),
            content_type: "application/pdf".into(),
            bytes: vec![0; 16],
        };
        assert!(validate_post_form(Some("ok"), &[pdf]).is_err());

        assert!(validate_post_form(Some("ok"), &[image(16)]).is_ok());
        assert!(validate_post_form(None, &[image(16)]).is_ok());
    }
}
