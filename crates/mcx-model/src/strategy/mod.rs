mod publish;
pub use publish::PublishPolicy;
