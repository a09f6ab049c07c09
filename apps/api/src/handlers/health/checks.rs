use redis::AsyncCommands;

use super::*;

pub(super) async fn check_postgres(pool: sqlx::PgPool) -> HealthDependencyStatus {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&pool).await {
        Ok(_) => ok_status(),
        Err(error) => error_status(format!("postgres check failed: {error}")),
    }
}

pub(super) async fn check_redis(
    redis_client: Option<redis::Client>,
    redis_required: bool,
) -> HealthDependencyStatus {
    let Some(redis_client) = redis_client else {
        return if redis_required {
            error_status("redis client is not configured".to_owned())
        } else {
            HealthDependencyStatus {
                status: "disabled",
                detail: None,
            }
        };
    };

    let mut connection = match redis_client.get_multiplexed_async_connection().await {
        Ok(connection) => connection,
        Err(error) => return error_status(format!("redis connection failed: {error}")),
    };

    match connection.ping::<String>().await {
        Ok(value) if value.eq_ignore_ascii_case("pong") => ok_status(),
        Ok(value) => error_status(format!("unexpected redis ping response: {value}")),
        Err(error) => error_status(format!("redis ping failed: {error}")),
    }
}

fn ok_status() -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "ok",
        detail: None,
    }
}

fn error_status(detail: String) -> HealthDependencyStatus {
    HealthDependencyStatus {
        status: "error",
        detail: Some(detail),
    }
}

#[cfg(test)]
mod tests {
    use super::check_redis;

    #[tokio::test]
    async fn optional_redis_reports_disabled() {
        let status = check_redis(None, false).await;
        assert_eq!(status.status, "disabled");
    }

    #[tokio::test]
    async fn required_redis_without_client_is_an_error() {
        let status = check_redis(None, true).await;
        assert_eq!(status.status, "error");
        assert!(status.detail.is_some());
    }
}
