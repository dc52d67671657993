pub const TABLE_NAME: &str = "taxi_trips";

/// Schema description handed to the LLM as generation context.
pub const TABLE_SCHEMA: &str = r#"
Table: taxi_trips
Columns:
- id: BIGINT PRIMARY KEY
- vendor_id: INTEGER (1=Creative Mobile, 2=VeriFone)
- tpep_pickup_datetime: TIMESTAMP (when meter was engaged)
- tpep_dropoff_datetime: TIMESTAMP (when meter was disengaged)
- passenger_count: INTEGER (number of passengers)
- trip_distance: DOUBLE (distance in miles)
- pickup_longitude: DOUBLE
- pickup_latitude: DOUBLE
- rate_code_id: INTEGER (1=Standard, 2=JFK, 3=Newark, 4=Nassau/Westchester, 5=Negotiated, 6=Group)
- store_and_fwd_flag: VARCHAR(1)
- dropoff_longitude: DOUBLE
- dropoff_latitude: DOUBLE
- payment_type: INTEGER (1=Credit card, 2=Cash, 3=No charge, 4=Dispute, 5=Unknown, 6=Voided)
- fare_amount: DOUBLE (time-and-distance fare in USD)
- extra: DOUBLE (miscellaneous extras)
- mta_tax: DOUBLE (MTA tax)
- tip_amount: DOUBLE (tip amount, auto-populated for credit cards)
- tolls_amount: DOUBLE (tolls paid)
- improvement_surcharge: DOUBLE
- total_amount: DOUBLE (total charged to passenger)

Common queries:
- Revenue analysis: Use total_amount, fare_amount
- Time analysis: Use tpep_pickup_datetime, tpep_dropoff_datetime
- Distance analysis: Use trip_distance
- Payment analysis: Use payment_type
"#;

pub const CREATE_TABLE_SQL: &str = r#"
CREATE SEQUENCE IF NOT EXISTS taxi_trips_id_seq;
CREATE TABLE IF NOT EXISTS taxi_trips (
    id BIGINT PRIMARY KEY DEFAULT nextval('taxi_trips_id_seq'),
    vendor_id INTEGER,
    tpep_pickup_datetime TIMESTAMP,
    tpep_dropoff_datetime TIMESTAMP,
    passenger_count INTEGER,
    trip_distance DOUBLE,
    pickup_longitude DOUBLE,
    pickup_latitude DOUBLE,
    rate_code_id INTEGER,
    store_and_fwd_flag VARCHAR(1),
    dropoff_longitude DOUBLE,
    dropoff_latitude DOUBLE,
    payment_type INTEGER,
    fare_amount DOUBLE,
    extra DOUBLE,
    mta_tax DOUBLE,
    tip_amount DOUBLE,
    tolls_amount DOUBLE,
    improvement_surcharge DOUBLE,
    total_amount DOUBLE
);
"#;

/// Loadable columns with their SQL types, in table order.
pub const TARGET_COLUMNS: &[(&str, &str)] = &[
    ("vendor_id", "INTEGER"),
    ("tpep_pickup_datetime", "TIMESTAMP"),
    ("tpep_dropoff_datetime", "TIMESTAMP"),
    ("passenger_count", "INTEGER"),
    ("trip_distance", "DOUBLE"),
    ("pickup_longitude", "DOUBLE"),
    ("pickup_latitude", "DOUBLE"),
    ("rate_code_id", "INTEGER"),
    ("store_and_fwd_flag", "VARCHAR"),
    ("dropoff_longitude", "DOUBLE"),
    ("dropoff_latitude", "DOUBLE"),
    ("payment_type", "INTEGER"),
    ("fare_amount", "DOUBLE"),
    ("extra", "DOUBLE"),
    ("mta_tax", "DOUBLE"),
    ("tip_amount", "DOUBLE"),
    ("tolls_amount", "DOUBLE"),
    ("improvement_surcharge", "DOUBLE"),
    ("total_amount", "DOUBLE"),
];

/// Source CSV headers that map to a differently named target column.
pub const HEADER_ALIASES: &[(&str, &str)] = &[
    ("VendorID", "vendor_id"),
    ("RatecodeID", "rate_code_id"),
    ("RateCodeID", "rate_code_id"),
];
