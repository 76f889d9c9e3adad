use crate::{AuthorityDomain, ObjectRef};

/// Call category of a remote procedure call. Each category has its own ring
/// buffer per entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RpcCategory {
    /// Server to owning client, reliable
    ClientReliable,
    /// Server to owning client, best effort
    ClientUnreliable,
    /// Owning client to server, reliable
    ServerReliable,
    /// Owning client to server, best effort
    ServerUnreliable,
    /// Server to every worker seeing the entity
    Multicast,
}

impl RpcCategory {
    pub const ALL: [RpcCategory; 5] = [
        RpcCategory::ClientReliable,
        RpcCategory::ClientUnreliable,
        RpcCategory::ServerReliable,
        RpcCategory::ServerUnreliable,
        RpcCategory::Multicast,
    ];

    pub fn is_reliable(&self) -> bool {
        matches!(self, RpcCategory::ClientReliable | RpcCategory::ServerReliable)
    }

    /// Authority domain whose holder writes this category's ring buffer
    pub fn sender_domain(&self) -> AuthorityDomain {
        match self {
            RpcCategory::ServerReliable | RpcCategory::ServerUnreliable => {
                AuthorityDomain::Secondary
            }
            RpcCategory::ClientReliable
            | RpcCategory::ClientUnreliable
            | RpcCategory::Multicast => AuthorityDomain::Primary,
        }
    }

    /// Authority domain whose holder extracts and acknowledges this category.
    /// Multicast has no single receiver and is never acknowledged.
    pub fn receiver_domain(&self) -> Option<AuthorityDomain> {
        match self {
            RpcCategory::Multicast => None,
            other => Some(other.sender_domain().invert()),
        }
    }

    pub fn is_acknowledged(&self) -> bool {
        self.receiver_domain().is_some()
    }

    pub fn sent_by(domain: AuthorityDomain) -> impl Iterator<Item = RpcCategory> {
        RpcCategory::ALL
            .into_iter()
            .filter(move |category| category.sender_domain() == domain)
    }

    pub fn received_by(domain: AuthorityDomain) -> impl Iterator<Item = RpcCategory> {
        RpcCategory::ALL
            .into_iter()
            .filter(move |category| category.receiver_domain() == Some(domain))
    }
}

/// What the local queue does when it reaches its limit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Refuse new calls and report `QueueError::QueueFull` to the caller
    Backpressure,
    /// Drop the oldest queued call to make room
    DropOldest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingBufferSettings {
    pub slots: u32,
    /// None means unbounded
    pub queue_limit: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

/// Opaque monotonic id handed to the written callback for every payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RpcId(pub u64);

/// A payload carried by the RPC ring buffers
pub trait RpcPayload: Clone {
    /// Object references the call's arguments hold. Extraction of the call
    /// waits until every one of them is locally resolvable.
    fn references(&self) -> Vec<ObjectRef> {
        Vec::new()
    }
}
