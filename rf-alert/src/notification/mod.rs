//! Alert notification: the dispatcher and the channels it fans out to.

pub mod attachments;
pub mod channels;
pub mod dispatcher;
pub mod events;
pub mod template;

pub use attachments::AttachmentResolver;
pub use channels::{
    EmailChannel, LocalCommandChannel, MailAttachment, MailMessage, MailTransport,
    MediaHostChannel, MediaHostRequest, NotificationChannel, SmtpMailer,
};
pub use dispatcher::AlertDispatcher;
pub use events::{AlertOccurrence, ChannelOutcome, ChannelStatus, DispatchReport};
