//! SQLite schema definition.

/// Complete database schema for carebase.
///
/// Dates are stored as `YYYY-MM-DD` and date-times as
/// `YYYY-MM-DD HH:MM:SS` text, so string comparison orders them correctly.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- People
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    birth_date TEXT,
    care_level INTEGER NOT NULL CHECK (care_level BETWEEN 1 AND 5),
    address TEXT NOT NULL DEFAULT '',
    lat REAL,
    lng REAL,
    phone TEXT,
    medications TEXT NOT NULL DEFAULT '[]',          -- JSON array of strings
    insurance TEXT NOT NULL DEFAULT '{}',            -- JSON object {provider, number}
    emergency_contact TEXT,                          -- JSON object
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(last_name, first_name);

CREATE TABLE IF NOT EXISTS employees (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    role TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    qualifications TEXT NOT NULL DEFAULT '{}',       -- JSON object of flags
    working_hours TEXT NOT NULL DEFAULT '{}',        -- JSON object weekday -> {start, end, is_working_day}
    max_patients_per_day INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_employees_name ON employees(last_name, first_name);

-- ============================================================================
-- Tours
-- ============================================================================

CREATE TABLE IF NOT EXISTS tours (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL REFERENCES employees(id),
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    patient_ids TEXT NOT NULL DEFAULT '[]',          -- JSON array, visit order
    status TEXT NOT NULL DEFAULT 'scheduled',
    optimized_route TEXT NOT NULL,                   -- JSON OptimizedRoute
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tours_employee_date ON tours(employee_id, date);
CREATE INDEX IF NOT EXISTS idx_tours_date ON tours(date);

-- ============================================================================
-- Shifts and roster planning
-- ============================================================================

CREATE TABLE IF NOT EXISTS shifts (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL REFERENCES employees(id),
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    shift_type TEXT NOT NULL DEFAULT 'regular',
    notes TEXT,
    conflict_info TEXT,                              -- JSON ConflictInfo
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CHECK (end_time > start_time)
);

CREATE INDEX IF NOT EXISTS idx_shifts_employee_start ON shifts(employee_id, start_time);

CREATE TABLE IF NOT EXISTS shift_templates (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL,
    shift_type TEXT NOT NULL,
    weekdays TEXT NOT NULL DEFAULT '[]',             -- JSON array of weekday names
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shift_preferences (
    employee_id TEXT PRIMARY KEY REFERENCES employees(id) ON DELETE CASCADE,
    preferred_shift_types TEXT NOT NULL DEFAULT '[]',
    unavailable_weekdays TEXT NOT NULL DEFAULT '[]',
    max_shifts_per_week INTEGER,
    notes TEXT,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS shift_change_requests (
    id TEXT PRIMARY KEY,
    shift_id TEXT NOT NULL,
    requested_by TEXT NOT NULL,
    kind TEXT NOT NULL,
    reason TEXT,
    proposed_start TEXT,
    proposed_end TEXT,
    swap_with_employee_id TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    decided_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_change_requests_status ON shift_change_requests(status);

-- ============================================================================
-- Documentation and billing
-- ============================================================================

CREATE TABLE IF NOT EXISTS documentation (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    tour_id TEXT,
    shift_id TEXT,
    author_id TEXT,
    date TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documentation_patient_date ON documentation(patient_id, date);

CREATE TABLE IF NOT EXISTS insurance_billings (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    insurance_provider TEXT NOT NULL DEFAULT '',
    billing_date TEXT NOT NULL,
    period_start TEXT NOT NULL,
    period_end TEXT NOT NULL,
    services TEXT NOT NULL DEFAULT '[]',             -- JSON array of BillingService
    total_cents INTEGER NOT NULL DEFAULT 0,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'draft',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_billings_patient ON insurance_billings(patient_id);

-- ============================================================================
-- Inventory
-- ============================================================================

CREATE TABLE IF NOT EXISTS expiry_items (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    category TEXT,
    quantity INTEGER NOT NULL DEFAULT 0,
    unit TEXT,
    expiry_date TEXT NOT NULL,
    location TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expiry_items_date ON expiry_items(expiry_date);
"#;
