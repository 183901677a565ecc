/// Provides constants and utilities for working with
/// the "humanitarian_deliveries" table.
pub struct DeliveryTable;

impl DeliveryTable {
    /// The name of the table
    pub const TABLE_NAME: &'static str = "humanitarian_deliveries";

    pub const COLUMN_BRANCH: &'static str = "branch";
    pub const COLUMN_ROUTE: &'static str = "route";
    pub const COLUMN_DELIVERY_ID: &'static str = "delivery_id";
    pub const COLUMN_ARRIVAL_DATE: &'static str = "arrival_date";
    pub const COLUMN_BENEFICIARIES_COUNT: &'static str = "beneficiaries_count";
    pub const COLUMN_CAPACITY_UTILISATION: &'static str = "capacity_utilisation";
    pub const COLUMN_CARGO_SUBTYPE: &'static str = "cargo_subtype";
    pub const COLUMN_CARGO_TYPE: &'static str = "cargo_type";
    pub const COLUMN_CREATED_DATE: &'static str = "created_date";
    pub const COLUMN_DAY_OF_WEEK: &'static str = "day_of_week";
    pub const COLUMN_DISTRIBUTION_CENTER: &'static str = "distribution_center";
    pub const COLUMN_DRIVER_NAME: &'static str = "driver_name";
    pub const COLUMN_REGION: &'static str = "region";
    pub const COLUMN_RELEASED_TONNES: &'static str = "released_tonnes";
    pub const COLUMN_REQUESTED_TONNES: &'static str = "requested_tonnes";
    pub const COLUMN_RETURN_PERCENTAGE: &'static str = "return_percentage";
    pub const COLUMN_STATUS: &'static str = "status";
    pub const COLUMN_URGENCY_LEVEL: &'static str = "urgency_level";
    pub const COLUMN_VEHICLE: &'static str = "vehicle";
    pub const COLUMN_VEHICLE_LOAD_TONNES: &'static str = "vehicle_load_tonnes";
    pub const COLUMN_WAREHOUSE_RELEASE_TIME_HOURS: &'static str = "warehouse_release_time_hours";
    pub const COLUMN_WEEK_RANGE: &'static str = "week_range";

    /// Projection order. Row conversion and CSV export both rely on it.
    pub const COLUMNS: [&'static str; 22] = [
        Self::COLUMN_BRANCH,
        Self::COLUMN_ROUTE,
        Self::COLUMN_DELIVERY_ID,
        Self::COLUMN_ARRIVAL_DATE,
        Self::COLUMN_BENEFICIARIES_COUNT,
        Self::COLUMN_CAPACITY_UTILISATION,
        Self::COLUMN_CARGO_SUBTYPE,
        Self::COLUMN_CARGO_TYPE,
        Self::COLUMN_CREATED_DATE,
        Self::COLUMN_DAY_OF_WEEK,
        Self::COLUMN_DISTRIBUTION_CENTER,
        Self::COLUMN_DRIVER_NAME,
        Self::COLUMN_REGION,
        Self::COLUMN_RELEASED_TONNES,
        Self::COLUMN_REQUESTED_TONNES,
        Self::COLUMN_RETURN_PERCENTAGE,
        Self::COLUMN_STATUS,
        Self::COLUMN_URGENCY_LEVEL,
        Self::COLUMN_VEHICLE,
        Self::COLUMN_VEHICLE_LOAD_TONNES,
        Self::COLUMN_WAREHOUSE_RELEASE_TIME_HOURS,
        Self::COLUMN_WEEK_RANGE,
    ];

    /// CQL statement selecting every projected column of every row.
    pub fn select_all() -> String {
        format!(
            "SELECT {} FROM {}",
            Self::COLUMNS.join(", "),
            Self::TABLE_NAME
        )
    }
}
