use serde::{Deserialize, Serialize};

// === Stored documents ===

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub following: Vec<String>,
    pub followers: Vec<String>,
    pub created_at: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<String>,
    pub comments: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post: String,
    pub user: String,
    pub content: String,
    pub likes: Vec<String>,
    pub replies: Vec<Reply>,
    pub created_at: String,
}

/// Replies live inside their comment and are not independently
/// likable or deletable.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub user: String,
    pub text: String,
    pub created_at: String,
}

// === Request bodies ===
//
// Every endpoint takes a statically defined schema; unknown fields are
// rejected rather than silently ignored.

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContentRequest {
    pub content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TextRequest {
    pub text: String,
}

// === Response views ===

/// The author summary attached to posts, comments and follower lists.
#[derive(Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            profile_picture: user.profile_picture.clone(),
        }
    }
}

/// The user object returned by register/login/me. Never carries the
/// password hash.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub following: Vec<String>,
    pub followers: Vec<String>,
    pub created_at: String,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            bio: user.bio.clone(),
            profile_picture: user.profile_picture.clone(),
            following: user.following.clone(),
            followers: user.followers.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Public profile: edges populated as summaries, plus the post count.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub posts_count: usize,
    pub created_at: String,
}

/// Search/explore result row.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    pub id: String,
    pub name: String,
    pub username: String,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    pub follower_count: usize,
}

impl From<&User> for UserCard {
    fn from(user: &User) -> Self {
        UserCard {
            id: user.id.clone(),
            name: user.name.clone(),
            username: user.username.clone(),
            profile_picture: user.profile_picture.clone(),
            bio: user.bio.clone(),
            follower_count: user.followers.len(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    pub id: String,
    pub user: UserSummary,
    pub text: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub post: String,
    pub user: UserSummary,
    pub content: String,
    pub likes: Vec<String>,
    pub like_count: usize,
    pub replies: Vec<ReplyView>,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub author: UserSummary,
    pub content: String,
    pub image: Option<String>,
    pub likes: Vec<String>,
    pub like_count: usize,
    pub comments: Vec<CommentView>,
    pub comment_count: usize,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsPage {
    pub posts: Vec<PostView>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    pub comments: Vec<CommentView>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_comments: usize,
}
