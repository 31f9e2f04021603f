//! Request bodies for the built-in suites.
use crate::args::{Cli, Suite};
use qrload::core::{RequestSpec, ScenarioConfig, BATCH_ENDPOINT, GENERATE_ENDPOINT};
use qrload::{PayloadSource, ScenarioSpec};
use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

const EYE_SHAPES: &[&str] = &[
    "square",
    "rounded_square",
    "circle",
    "dot",
    "leaf",
    "bars-horizontal",
    "bars-vertical",
    "star",
    "diamond",
    "cross",
    "hexagon",
    "heart",
    "shield",
    "crystal",
    "flower",
    "arrow",
];

const DATA_PATTERNS: &[&str] = &[
    "square",
    "dots",
    "rounded",
    "vertical",
    "horizontal",
    "diamond",
    "circular",
    "star",
    "cross",
    "random",
    "wave",
    "mosaic",
];

const GRADIENT_TYPES: &[&str] = &["linear", "radial", "conic", "diamond", "spiral"];

const EFFECT_TYPES: &[&str] = &["shadow", "glow", "blur", "noise", "vintage"];

const TLDS: &[&str] = &["com", "org", "net", "io", "dev"];

const BATCH_SIZE: usize = 5;

/// Shared random source. Payload sources are called from the scheduling task only, so the lock
/// is never contended.
#[derive(Clone)]
pub struct Entropy(Arc<Mutex<StdRng>>);

impl Entropy {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self(Arc::new(Mutex::new(rng)))
    }

    fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

fn token(rng: &mut StdRng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn color(rng: &mut StdRng) -> String {
    format!("#{:06x}", rng.gen_range(0..=0xFFFFFFu32))
}

fn pick<'a>(rng: &mut StdRng, options: &[&'a str]) -> &'a str {
    options.choose(rng).copied().unwrap_or_default()
}

pub fn basic() -> Value {
    json!({ "data": "https://example.com/test", "options": { "size": 300 } })
}

pub fn medium() -> Value {
    json!({
        "data": "https://example.com/test",
        "options": {
            "size": 300,
            "customization": {
                "eye_shape": "circle",
                "data_pattern": "dots",
                "colors": { "foreground": "#000000", "background": "#FFFFFF" }
            }
        }
    })
}

pub fn advanced() -> Value {
    json!({
        "data": "https://example.com/test",
        "options": {
            "size": 500,
            "customization": {
                "eye_shape": "rounded",
                "data_pattern": "rounded",
                "gradient": {
                    "enabled": true,
                    "gradient_type": "linear",
                    "colors": ["#FF6B6B", "#4ECDC4"],
                    "angle": 45
                },
                "frame": { "style": "rounded", "text": "Scan Me", "color": "#333333" }
            }
        }
    })
}

/// Five codes for the batch endpoint, distinct per index.
pub fn batch(index: usize) -> Value {
    let requests: Vec<_> = (0..BATCH_SIZE)
        .map(|i| {
            json!({
                "id": i.to_string(),
                "data": format!("https://example.com/{index}/{i}"),
                "options": { "size": 200 }
            })
        })
        .collect();
    json!({ "requests": requests })
}

/// Same body for every index: the first request misses the cache, the rest should hit.
pub struct Fixed {
    endpoint: String,
    body: Value,
}

impl Fixed {
    pub fn new(endpoint: impl Into<String>, body: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            body,
        }
    }
}

impl PayloadSource for Fixed {
    fn request(&self, _index: usize) -> RequestSpec {
        RequestSpec::new(self.endpoint.as_str(), self.body.clone())
    }
}

/// Rotates through realistic data shapes (urls, contact cards, JSON blobs, heavily customized
/// codes) with random content, so almost every request is a cache miss.
pub struct MixedPatterns {
    endpoint: String,
    entropy: Entropy,
}

impl MixedPatterns {
    pub const PATTERNS: usize = 9;

    pub fn new(entropy: Entropy) -> Self {
        Self {
            endpoint: GENERATE_ENDPOINT.to_string(),
            entropy,
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl PayloadSource for MixedPatterns {
    fn request(&self, index: usize) -> RequestSpec {
        let body = self.entropy.with(|rng| match index % Self::PATTERNS {
            0 => json!({
                "data": format!("https://example.com/{}", token(rng, 10)),
                "options": { "size": 300 }
            }),
            1 => json!({
                "data": format!("Product ID: {}", token(rng, 8)),
                "options": { "size": 250 }
            }),
            2 => json!({
                "data": format!("user{}@example.com", token(rng, 5)),
                "options": { "size": 280 }
            }),
            3 => json!({
                "data": format!("+1-555-{:07}", rng.gen_range(0..10_000_000u32)),
                "options": { "size": 200 }
            }),
            4 => json!({
                "data": json!({ "id": token(rng, 8), "seq": index, "data": token(rng, 16) }).to_string(),
                "options": { "size": 400, "error_correction": "H" }
            }),
            5 => json!({
                "data": format!(
                    "BEGIN:VCARD\nVERSION:3.0\nFN:User {index}\nTEL:+1-555-{}\nEND:VCARD",
                    rng.gen_range(1_000_000..10_000_000u32)
                ),
                "options": { "size": 350 }
            }),
            pattern => {
                let mut customization = json!({
                    "eye_shape": pick(rng, &["square", "circle", "rounded"]),
                    "data_pattern": pick(rng, &["square", "dots", "rounded"]),
                });
                match pattern {
                    6 => {
                        customization["gradient"] = json!({
                            "enabled": true,
                            "gradient_type": "linear",
                            "colors": ["#FF0000", "#00FF00", "#0000FF"],
                            "angle": 45
                        })
                    }
                    7 => {
                        customization["logo"] = json!({
                            "data": "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==",
                            "size": 50,
                            "padding": 5
                        })
                    }
                    _ => {
                        customization["effects"] = json!([
                            { "effect_type": "shadow", "intensity": 0.3, "color": "#000000" }
                        ])
                    }
                }
                json!({
                    "data": format!("Complex QR {index}: {}", token(rng, 20)),
                    "options": { "size": 400, "margin": 2, "customization": customization }
                })
            }
        });
        RequestSpec::new(self.endpoint.as_str(), body)
    }
}

/// Random URL with a random mix of colors, gradient, eye shape, data pattern and effects.
pub struct RandomCustomization {
    endpoint: String,
    entropy: Entropy,
}

impl RandomCustomization {
    pub fn new(entropy: Entropy) -> Self {
        Self {
            endpoint: GENERATE_ENDPOINT.to_string(),
            entropy,
        }
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

impl PayloadSource for RandomCustomization {
    fn request(&self, _index: usize) -> RequestSpec {
        RequestSpec::new(self.endpoint.as_str(), self.entropy.with(random_config))
    }
}

fn random_url(rng: &mut StdRng) -> String {
    let len = rng.gen_range(3..=8);
    let subdomain = token(rng, len).to_lowercase();
    let len = rng.gen_range(5..=10);
    let domain = token(rng, len).to_lowercase();
    let tld = pick(rng, TLDS);
    let path = if rng.gen_bool(0.5) {
        let len = rng.gen_range(0..=15);
        format!("/{}", token(rng, len).to_lowercase())
    } else {
        String::new()
    };
    format!("https://{subdomain}.{domain}.{tld}{path}")
}

fn random_config(rng: &mut StdRng) -> Value {
    let mut customization = serde_json::Map::new();

    if rng.gen_bool(0.7) {
        customization.insert(
            "colors".to_string(),
            json!({ "foreground": color(rng), "background": color(rng) }),
        );
    }

    if rng.gen_bool(0.5) {
        let gradient_type = pick(rng, GRADIENT_TYPES);
        let mut colors = vec![color(rng), color(rng)];
        if rng.gen_bool(0.3) {
            colors.push(color(rng));
        }
        let mut gradient = json!({
            "enabled": true,
            "gradient_type": gradient_type,
            "colors": colors,
            "apply_to_eyes": rng.gen_bool(0.5),
            "apply_to_data": rng.gen_bool(0.5),
        });
        if gradient_type == "linear" {
            gradient["angle"] = json!(rng.gen_range(0..=360));
        }
        if rng.gen_bool(0.5) {
            gradient["stroke_style"] = json!({
                "enabled": true,
                "color": color(rng),
                "width": (rng.gen_range(0.1..=2.0f64) * 10.).round() / 10.,
                "opacity": (rng.gen_range(0.1..=1.0f64) * 10.).round() / 10.,
            });
        }
        customization.insert("gradient".to_string(), gradient);
    }

    if rng.gen_bool(0.8) {
        customization.insert("eye_shape".to_string(), json!(pick(rng, EYE_SHAPES)));
    }

    if rng.gen_bool(0.8) {
        customization.insert("data_pattern".to_string(), json!(pick(rng, DATA_PATTERNS)));
    }

    let effects = rng.gen_range(0..=3);
    if effects > 0 {
        let effects: Vec<_> = EFFECT_TYPES
            .choose_multiple(rng, effects)
            .copied()
            .collect::<Vec<_>>()
            .into_iter()
            .map(|effect_type| {
                let mut effect = json!({ "effect_type": effect_type });
                if effect_type == "glow" && rng.gen_bool(0.5) {
                    effect["config"] = json!({ "color": color(rng) });
                }
                effect
            })
            .collect();
        customization.insert("effects".to_string(), json!(effects));
    }

    let mut options = json!({ "error_correction": pick(rng, &["L", "M", "Q", "H"]) });
    if !customization.is_empty() {
        options["customization"] = Value::Object(customization);
    }

    json!({ "data": random_url(rng), "options": options })
}

fn scaled(value: usize, divisor: usize) -> usize {
    (value / divisor).max(1)
}

/// Scenarios of the selected suite, in run order.
pub fn suite(cli: &Cli, entropy: &Entropy) -> Vec<ScenarioSpec> {
    let shape = |name: &str, requests: usize, concurrency: usize| {
        let config = ScenarioConfig::new(name)
            .requests(requests)
            .concurrency(concurrency.max(1));
        match cli.delay {
            Some(delay) => config.delay(delay),
            None => config,
        }
    };
    let (r, c) = (cli.requests, cli.concurrency);
    let clear = !cli.skip_cache_clear && cli.warmup == 0;
    let endpoint = cli.endpoint.as_str();

    match cli.suite {
        Suite::Standard => vec![
            ScenarioSpec::new(
                shape("basic-cold", r, c).clear_cache(clear),
                Fixed::new(endpoint, basic()),
            ),
            ScenarioSpec::new(
                shape("basic-warm", r, c),
                Fixed::new(endpoint, basic()),
            ),
            ScenarioSpec::new(
                shape("medium", scaled(r, 2), c / 2),
                Fixed::new(endpoint, medium()),
            ),
            ScenarioSpec::new(
                shape("advanced", scaled(r, 4), c / 4),
                Fixed::new(endpoint, advanced()),
            ),
            ScenarioSpec::new(
                shape("mixed-patterns", r, c),
                MixedPatterns::new(entropy.clone()).endpoint(endpoint),
            ),
            ScenarioSpec::new(shape("batch", scaled(r, 10), c / 5), |idx: usize| {
                RequestSpec::new(BATCH_ENDPOINT, batch(idx))
            }),
        ],
        Suite::Random => vec![ScenarioSpec::new(
            shape("random-customization", r, c).clear_cache(clear),
            RandomCustomization::new(entropy.clone()).endpoint(endpoint),
        )],
    }
}

/// Warm-up run derived from the first scenario of the suite, at most 10 requests at once.
/// It takes over the first scenario's cache clear.
pub fn warmup(cli: &Cli, first: &ScenarioSpec) -> Option<ScenarioSpec> {
    if cli.warmup == 0 {
        return None;
    }
    let config = ScenarioConfig::new("warmup")
        .requests(cli.warmup)
        .concurrency(cli.warmup.min(10))
        .clear_cache(!cli.skip_cache_clear);
    Some(first.with_config(config))
}
