#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::test::TestRequest;
use actix_web::web::{Data, ServiceConfig};
use chrono::NaiveDate;

use magang_eval::auth::jwt::generate_access_token;
use magang_eval::config::Config;
use magang_eval::engine::calendar::is_weekend;
use magang_eval::engine::EvaluationEngine;
use magang_eval::model::attendance::{AttendanceRecord, AttendanceStatus};
use magang_eval::model::role::Role;
use magang_eval::model::user::UserSummary;
use magang_eval::repo::memory::MemoryStore;
use magang_eval::routes;

pub const SECRET: &str = "integration-test-secret";

pub fn config() -> Config {
    Config {
        database_url: "mysql://unused".to_string(),
        jwt_secret: SECRET.to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        db_max_connections: 1,
        rate_protected_per_min: 1000,
        api_prefix: "/api".to_string(),
        log_level: "info".to_string(),
        log_dir: "logs".to_string(),
    }
}

pub fn configure(store: Arc<MemoryStore>) -> impl FnOnce(&mut ServiceConfig) {
    configure_with(store, config())
}

pub fn configure_with(store: Arc<MemoryStore>, config: Config) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(Data::new(config.clone()))
            .app_data(Data::new(EvaluationEngine::from_store(store)));
        routes::configure(cfg, config);
    }
}

pub fn token(role: Role) -> String {
    generate_access_token(1, "admin".to_string(), role as u8, SECRET, 3600).unwrap()
}

/// Request from a fixed peer so the per-IP limiter can key it.
pub fn request(req: TestRequest) -> TestRequest {
    let peer: SocketAddr = "127.0.0.1:8080".parse().unwrap();
    req.peer_addr(peer)
}

pub fn as_admin(req: TestRequest) -> TestRequest {
    request(req).insert_header(("Authorization", format!("Bearer {}", token(Role::Admin))))
}

pub fn user(id: u64, name: &str) -> UserSummary {
    UserSummary {
        id,
        name: name.to_string(),
        email: format!("{}@kampus.ac.id", name.to_lowercase()),
        instansi: Some("Politeknik Negeri".to_string()),
    }
}

/// Weekdays of February 2025: 20 working days, no holidays.
pub fn february_weekdays() -> Vec<NaiveDate> {
    (1..=28)
        .filter_map(|d| NaiveDate::from_ymd_opt(2025, 2, d))
        .filter(|d| !is_weekend(*d))
        .collect()
}

pub fn attend_every_day(store: &MemoryStore, user_id: u64, status: AttendanceStatus) {
    for day in february_weekdays() {
        store.add_attendance(AttendanceRecord {
            user_id,
            date: day.and_hms_opt(8, 0, 0).unwrap(),
            status,
        });
    }
}
