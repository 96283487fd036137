/// Local database migrations - each tuple is (name, SQL)
///
/// Timestamps are stored as RFC 3339 text in UTC with a fixed width, so
/// text ordering matches time ordering.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_schema",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id VARCHAR PRIMARY KEY,
            wallet_address VARCHAR NOT NULL UNIQUE,
            total_points BIGINT NOT NULL DEFAULT 0,
            sun_balance BIGINT NOT NULL DEFAULT 0,
            total_missions_completed BIGINT NOT NULL DEFAULT 0,
            streak BIGINT NOT NULL DEFAULT 0,
            last_checkin VARCHAR,
            created_at VARCHAR NOT NULL,
            updated_at VARCHAR NOT NULL
        );

        CREATE TABLE IF NOT EXISTS missions (
            id VARCHAR PRIMARY KEY,
            name VARCHAR NOT NULL,
            description VARCHAR NOT NULL DEFAULT '',
            mission_type VARCHAR NOT NULL DEFAULT '',
            points_reward BIGINT NOT NULL DEFAULT 0,
            sun_reward BIGINT NOT NULL DEFAULT 0,
            action_url VARCHAR,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        );

        CREATE TABLE IF NOT EXISTS completed_missions (
            user_id VARCHAR NOT NULL,
            mission_id VARCHAR NOT NULL,
            completed_at VARCHAR NOT NULL,
            PRIMARY KEY (user_id, mission_id)
        );

        CREATE TABLE IF NOT EXISTS achievements (
            id VARCHAR PRIMARY KEY,
            name VARCHAR NOT NULL,
            description VARCHAR NOT NULL DEFAULT '',
            icon VARCHAR,
            condition_type VARCHAR,
            condition_value BIGINT NOT NULL DEFAULT 0,
            points_reward BIGINT NOT NULL DEFAULT 0,
            is_active BOOLEAN NOT NULL DEFAULT TRUE
        );

        CREATE TABLE IF NOT EXISTS user_achievements (
            user_id VARCHAR NOT NULL,
            achievement_id VARCHAR NOT NULL,
            achieved_at VARCHAR NOT NULL,
            PRIMARY KEY (user_id, achievement_id)
        );

        CREATE TABLE IF NOT EXISTS transactions (
            id VARCHAR PRIMARY KEY,
            wallet_address VARCHAR NOT NULL,
            kind VARCHAR NOT NULL,
            amount DOUBLE NOT NULL,
            currency VARCHAR,
            status VARCHAR,
            created_at VARCHAR NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_transactions_wallet ON transactions(wallet_address);
        "#,
    ),
];

/// Starter missions and achievements for an empty local database.
/// The first entry is the default "first login" achievement.
pub const DEFAULT_CATALOG: &str = r#"
        INSERT INTO achievements (id, name, description, icon, condition_type, condition_value, points_reward) VALUES
            ('a1eebc99-9c0b-4ef8-bb6d-6bb9bd380a11', 'First Login', 'Complete your first daily check-in', 'fas fa-door-open', NULL, 0, 10),
            ('b2eebc99-9c0b-4ef8-bb6d-6bb9bd380a12', 'Week Warrior', 'Keep a 7 day check-in streak', 'fas fa-fire', 'streak', 7, 50),
            ('c3eebc99-9c0b-4ef8-bb6d-6bb9bd380a13', 'Mission Rookie', 'Complete 3 missions', 'fas fa-flag', 'missions_completed', 3, 30),
            ('d4eebc99-9c0b-4ef8-bb6d-6bb9bd380a14', 'Century', 'Reach 100 points', 'fas fa-star', 'points', 100, 25),
            ('e5eebc99-9c0b-4ef8-bb6d-6bb9bd380a15', 'Sun Collector', 'Hold 50 SUN', 'fas fa-sun', 'sun_balance', 50, 40);

        INSERT INTO missions (id, name, description, mission_type, points_reward, sun_reward, action_url) VALUES
            ('m1-follow-twitter', 'Follow on Twitter', 'Follow the project account', 'twitter', 20, 5, 'https://twitter.com/'),
            ('m2-join-discord', 'Join Discord', 'Join the community server', 'discord', 20, 5, 'https://discord.com/'),
            ('m3-join-telegram', 'Join Telegram', 'Join the announcement channel', 'telegram', 15, 3, 'https://t.me/'),
            ('m4-feedback', 'Send Feedback', 'Tell us what to build next', 'feedback', 10, 2, NULL);
"#;
