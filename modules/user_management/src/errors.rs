//! HTTP error catalog for the user_management module.

use modkit_errors::ErrDef;

pub const USERS_NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "User not found",
    code: "USERS_NOT_FOUND",
    type_url: "https://errors.example.com/USERS_NOT_FOUND",
};

pub const USERS_VALIDATION: ErrDef = ErrDef {
    status: 400,
    title: "Validation error",
    code: "USERS_VALIDATION",
    type_url: "https://errors.example.com/USERS_VALIDATION",
};

pub const INTERNAL_DB: ErrDef = ErrDef {
    status: 500,
    title: "Internal error",
    code: "INTERNAL_DB",
    type_url: "https://errors.example.com/INTERNAL_DB",
};

pub const LOGS_NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "Log entry not found",
    code: "LOGS_NOT_FOUND",
    type_url: "https://errors.example.com/LOGS_NOT_FOUND",
};
