mod comment_repository;
mod community_repository;
mod friendship_repository;
mod message_repository;
mod post_repository;
mod profile_repository;
mod scrap_repository;
mod upload_repository;
mod user_repository;

pub use comment_repository::CommentRepository;
pub use community_repository::CommunityRepository;
pub use friendship_repository::FriendshipRepository;
pub use message_repository::MessageRepository;
pub use post_repository::{PostFilter, PostRepository};
pub use profile_repository::ProfileRepository;
pub use scrap_repository::ScrapRepository;
pub use upload_repository::{public_url, UploadRepository};
pub use user_repository::UserRepository;
