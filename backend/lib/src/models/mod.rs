//! Database rows and API payloads

pub mod chats;
pub mod comments;
pub mod posts;
pub mod reactions;
pub mod users;

pub use chats::{
    direct_chat_key, Chat, ChatDto, ChatParticipant, Message, MessageDto, SendMessageRequest,
};
pub use comments::{Comment, CommentDto, CreateCommentRequest, UpdateCommentRequest};
pub use posts::{CreatePostRequest, Post, PostDto, PostFilter, UpdatePostRequest};
pub use reactions::{
    ReactRequest, Reaction, ReactionCounts, ReactionDto, ReactionSummary, ReactionTarget,
    ReactionType,
};
pub use users::{User, UserDto, UserSummary};
