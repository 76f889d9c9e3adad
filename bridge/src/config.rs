use std::collections::HashMap;

use crate::{
    constants::{
        DEFAULT_DORMANCY_THRESHOLD, DEFAULT_ENTITY_ID_BATCH_SIZE, DEFAULT_ENTITY_ID_LOW_WATERMARK,
        DEFAULT_HISTORY_CAPACITY, DEFAULT_MAX_FIELDS_PER_MESSAGE, DEFAULT_RING_BUFFER_SLOTS,
        DEFAULT_UNRELIABLE_QUEUE_LIMIT,
    },
    rpc::rpc_category::{OverflowPolicy, RingBufferSettings, RpcCategory},
};

/// Contains Config properties which will be used by the ReplicationBridge
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Name of this worker, compared against net-ownership data to decide
    /// whether owner-only components are visible locally
    pub worker_id: String,
    /// Capacity of every channel's changelist history ring
    pub history_capacity: usize,
    /// Maximum number of fields the wire accepts in a single component message
    pub max_fields_per_message: usize,
    /// Number of consecutive empty replicate passes before a channel that
    /// requested dormancy actually goes dormant
    pub dormancy_threshold: u32,
    /// Number of entity ids requested per reservation command
    pub entity_id_batch_size: u32,
    /// A new reservation is requested once the pool drops below this many ids
    pub entity_id_low_watermark: usize,
    pub rpc: RpcRingBufferConfig,
}

impl BridgeConfig {
    pub fn new(worker_id: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            ..Self::default()
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_id: String::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            max_fields_per_message: DEFAULT_MAX_FIELDS_PER_MESSAGE,
            dormancy_threshold: DEFAULT_DORMANCY_THRESHOLD,
            entity_id_batch_size: DEFAULT_ENTITY_ID_BATCH_SIZE,
            entity_id_low_watermark: DEFAULT_ENTITY_ID_LOW_WATERMARK,
            rpc: RpcRingBufferConfig::default(),
        }
    }
}

/// Per-category ring buffer sizing and local queue policy
#[derive(Clone, Debug)]
pub struct RpcRingBufferConfig {
    settings: HashMap<RpcCategory, RingBufferSettings>,
}

impl RpcRingBufferConfig {
    pub fn settings(&self, category: RpcCategory) -> &RingBufferSettings {
        // every category is populated on construction
        &self.settings[&category]
    }

    pub fn set(&mut self, category: RpcCategory, settings: RingBufferSettings) {
        self.settings.insert(category, settings);
    }

    pub fn with(mut self, category: RpcCategory, settings: RingBufferSettings) -> Self {
        self.set(category, settings);
        self
    }

    pub fn slots(&self, category: RpcCategory) -> u32 {
        self.settings(category).slots
    }
}

impl Default for RpcRingBufferConfig {
    fn default() -> Self {
        let mut settings = HashMap::new();
        for category in RpcCategory::ALL {
            let category_settings = if category.is_reliable() {
                RingBufferSettings {
                    slots: DEFAULT_RING_BUFFER_SLOTS,
                    queue_limit: None,
                    overflow_policy: OverflowPolicy::Backpressure,
                }
            } else {
                RingBufferSettings {
                    slots: DEFAULT_RING_BUFFER_SLOTS,
                    queue_limit: Some(DEFAULT_UNRELIABLE_QUEUE_LIMIT),
                    overflow_policy: OverflowPolicy::DropOldest,
                }
            };
            settings.insert(category, category_settings);
        }
        Self { settings }
    }
}
