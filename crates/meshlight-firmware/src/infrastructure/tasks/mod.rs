pub(crate) mod node;

pub(crate) use node::{boot_flash, node_config, node_task, select_role};
