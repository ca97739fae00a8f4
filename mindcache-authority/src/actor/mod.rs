mod broadcast;
mod instance_actor;
mod messages;
mod registry;

pub use broadcast::BroadcastMessage;
pub use instance_actor::InstanceActor;
pub use messages::ActorMessage;
pub use registry::InstanceRegistry;
