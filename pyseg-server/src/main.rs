use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, put, web};
use serde::Deserialize;

use pyseg_core::config::{Granularity, Mode, SegmenterConfig, UpdateRule};
use pyseg_core::corpus::Corpus;
use pyseg_core::io::{corpus_names, corpus_path};
use pyseg_core::segmenter::Segmenter;

const DATA_FOLDER: &str = "./data";

/// Query parameters of the `/v1/train` endpoint
#[derive(Deserialize)]
struct TrainParams {
	corpus: Option<String>,
	granularity: Option<Granularity>,
	rule: Option<UpdateRule>,
	mode: Option<Mode>,
	iterations: Option<usize>,
	seed: Option<u64>,
	a: Option<f64>,
	b: Option<f64>,
}

/// Query parameters of the `/v1/segment` endpoint
#[derive(Deserialize)]
struct SegmentParams {
	text: Option<String>,
}

struct SharedData {
	segmenter: Option<Segmenter>,
}

impl TrainParams {
	fn config(&self) -> Result<SegmenterConfig, String> {
		let defaults = SegmenterConfig::default();
		let mut config = SegmenterConfig::new(
			self.granularity.unwrap_or(defaults.granularity),
			self.rule.unwrap_or(defaults.rule),
			self.mode.unwrap_or(defaults.mode),
		);
		config.iterations = self.iterations.unwrap_or(defaults.iterations);
		config.seed = self.seed.unwrap_or(defaults.seed);
		if self.a.is_some() || self.b.is_some() {
			let (a, b) = config.unigram_hyperparameters();
			config.set_unigram_hyperparameters(self.a.unwrap_or(a), self.b.unwrap_or(b))?;
		}
		Ok(config)
	}
}

/// Corpus name as a plain file stem of the data folder.
fn corpus_name(name: Option<&str>) -> Result<&str, String> {
	let name = name.map(str::trim).unwrap_or_default();
	if name.is_empty() {
		return Err("Missing or empty corpus name".to_owned());
	}
	if name.contains(['/', '\\']) || name.contains("..") {
		return Err(format!("Invalid corpus name '{name}'"));
	}
	Ok(name)
}

/// HTTP GET endpoint `/v1/corpora`
///
/// Lists the corpus names (`.txt` files of the data folder).
#[get("/v1/corpora")]
async fn get_corpora() -> impl Responder {
	let names = match corpus_names(DATA_FOLDER) {
		Ok(names) => names,
		Err(_) => return HttpResponse::InternalServerError().body("Failed to list corpora"),
	};
	HttpResponse::Ok().body(names.join("\n"))
}

/// HTTP PUT endpoint `/v1/train`
///
/// Trains a new segmenter on a corpus of the data folder, replacing the
/// current one, and returns its training scores.
#[put("/v1/train")]
async fn put_train(data: web::Data<Mutex<SharedData>>, query: web::Query<TrainParams>) -> impl Responder {
	let name = match corpus_name(query.corpus.as_deref()) {
		Ok(name) => name.to_owned(),
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let config = match query.config() {
		Ok(config) => config,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};
	let corpus = match Corpus::read(corpus_path(DATA_FOLDER, &name)) {
		Ok(corpus) => corpus,
		Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to read corpus: {e}")),
	};
	let mut segmenter = match Segmenter::new(corpus, config) {
		Ok(segmenter) => segmenter,
		Err(e) => return HttpResponse::BadRequest().body(e),
	};

	let segmenter = match web::block(move || {
		segmenter.train();
		segmenter
	})
	.await
	{
		Ok(segmenter) => segmenter,
		Err(_) => return HttpResponse::InternalServerError().body("Training failed"),
	};
	let score = segmenter.score();
	log::info!("trained on '{name}': {score}");

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Segmenter lock failed"),
	};
	shared_data.segmenter = Some(segmenter);
	HttpResponse::Ok().json(score)
}

/// HTTP GET endpoint `/v1/segment`
///
/// Segments each line of `text` with the trained model.
#[get("/v1/segment")]
async fn get_segment(data: web::Data<Mutex<SharedData>>, query: web::Query<SegmentParams>) -> impl Responder {
	let lines: Vec<&str> = match &query.text {
		Some(s) if !s.trim().is_empty() => s.lines().collect(),
		_ => return HttpResponse::BadRequest().body("Missing or empty text"),
	};
	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Segmenter lock failed"),
	};
	let Some(segmenter) = shared_data.segmenter.as_mut() else {
		return HttpResponse::Conflict().body("No trained segmenter");
	};
	match segmenter.segment(&lines[..]) {
		Ok(segmentations) => HttpResponse::Ok().body(segmentations.join("\n")),
		Err(e) => HttpResponse::BadRequest().body(e),
	}
}

/// HTTP GET endpoint `/v1/score`
///
/// Scores of the current training segmentation.
#[get("/v1/score")]
async fn get_score(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Segmenter lock failed"),
	};
	match &shared_data.segmenter {
		Some(segmenter) => HttpResponse::Ok().json(segmenter.score()),
		None => HttpResponse::Conflict().body("No trained segmenter"),
	}
}

/// Main entry point for the server.
///
/// Wraps the segmenter in a `Mutex` and starts an Actix-web HTTP server.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Corpora are read from `./data/<name>.txt`.
/// - Training runs on the blocking thread pool; the lock is only held to swap segmenters.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let shared_data = SharedData { segmenter: None };
	let shared_segmenter = web::Data::new(Mutex::new(shared_data));

	log::info!("listening on 127.0.0.1:5000");
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_segmenter.clone())
			.service(get_corpora)
			.service(put_train)
			.service(get_segment)
			.service(get_score)
	})
	.bind(("127.0.0.1", 5000))?
	.run()
	.await
}
