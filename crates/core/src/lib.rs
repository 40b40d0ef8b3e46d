pub mod aggregate;
pub mod display;
pub mod domain;
pub mod llm;
pub mod screenshot;

pub mod config {
    use anyhow::Context;

    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ExtractorKind {
        OpenAi,
        Fixture,
    }

    impl std::str::FromStr for ExtractorKind {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> anyhow::Result<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "openai" => Ok(Self::OpenAi),
                "fixture" => Ok(Self::Fixture),
                other => anyhow::bail!("unknown SNIP_EXTRACTOR value: {other} (expected openai|fixture)"),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub extractor: ExtractorKind,
        pub sentry_dsn: Option<String>,
        pub port: u16,
        pub max_upload_bytes: usize,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let extractor = match std::env::var("SNIP_EXTRACTOR") {
                Ok(v) if !v.trim().is_empty() => v
                    .parse::<ExtractorKind>()
                    .context("invalid SNIP_EXTRACTOR")?,
                _ => ExtractorKind::OpenAi,
            };

            Ok(Self {
                extractor,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
                max_upload_bytes: std::env::var("SNIP_MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            })
        }
    }

}
