//! Permission strings checked by the route layers.
//!
//! Permissions follow the `resource:action` convention; roles may hold
//! `resource:*` wildcards or the `*` super-wildcard.

pub mod consts {
    // ASU production entries and count products
    pub const PRODUCTION_READ: &str = "production:read";
    pub const PRODUCTION_WRITE: &str = "production:write";

    // ASU machines, configurations and plant machines
    pub const MACHINES_READ: &str = "machines:read";
    pub const MACHINES_WRITE: &str = "machines:write";

    // Inventory
    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_ADJUST: &str = "inventory:adjust";

    // Dyeing
    pub const DYEING_READ: &str = "dyeing:read";
    pub const DYEING_WRITE: &str = "dyeing:write";

    // Work orders and production jobs
    pub const WORKORDERS_READ: &str = "workorders:read";
    pub const WORKORDERS_WRITE: &str = "workorders:write";

    // Bill of materials
    pub const BOMS_READ: &str = "boms:read";
    pub const BOMS_MANAGE: &str = "boms:manage";

    // Costing
    pub const COSTING_READ: &str = "costing:read";

    // Users
    pub const USERS_MANAGE: &str = "users:manage";
}
