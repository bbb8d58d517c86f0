#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::thread;

use tally_core::metrics::{HistogramVec, Registry};

const BUCKETS: [f64; 9] = [1.0, 50.0, 100.0, 200.0, 400.0, 500.0, 800.0, 1000.0, 2000.0];

fn request_histogram() -> HistogramVec<3> {
    HistogramVec::new(
        "http_express_server_req_res_time",
        "This tells how much time is taken by req and res",
        ["method", "route", "status_code"],
        &BUCKETS,
    )
    .unwrap()
}

#[test]
fn rejects_bad_bounds() {
    assert!(HistogramVec::new("h", "x", [], &[]).is_err());
    assert!(HistogramVec::new("h", "x", [], &[1.0, 1.0]).is_err());
    assert!(HistogramVec::new("h", "x", [], &[2.0, 1.0]).is_err());
    assert!(HistogramVec::new("h", "x", [], &[1.0, f64::INFINITY]).is_err());
}

#[test]
fn bounds_are_inclusive_and_cumulative() {
    let h = request_histogram();
    let labels = ["GET", "/", "200"];
    h.observe(labels, 1.0);
    h.observe(labels, 50.5);
    h.observe(labels, 2500.0);

    let snap = h.snapshot(labels).unwrap();
    assert_eq!(snap.count, 3);
    assert!((snap.sum - 2551.5).abs() < 1e-9);

    let counts: Vec<u64> = snap.buckets.iter().map(|(_, c)| *c).collect();
    assert_eq!(counts, vec![1, 1, 2, 2, 2, 2, 2, 2, 2]);
}

#[test]
fn separate_label_sets_get_separate_series() {
    let h = request_histogram();
    h.observe(["GET", "/", "200"], 3.0);
    h.observe(["GET", "/?a=1", "200"], 3.0);
    h.observe(["GET", "/slow", "500"], 3.0);

    assert_eq!(h.series_len(), 3);
    assert!(h.snapshot(["GET", "/", "500"]).is_none());
}

#[test]
fn renders_le_first_then_declared_labels() {
    let registry = Registry::new();
    let h = Arc::new(request_histogram());
    registry.register(h.clone()).unwrap();
    h.observe(["GET", "/", "200"], 0.25);

    let body = registry.metrics();
    let expected = "\
# HELP http_express_server_req_res_time This tells how much time is taken by req and res
# TYPE http_express_server_req_res_time histogram
http_express_server_req_res_time_bucket{le=\"1\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"50\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"100\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"200\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"400\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"500\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"800\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"1000\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"2000\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_bucket{le=\"+Inf\",method=\"GET\",route=\"/\",status_code=\"200\"} 1
http_express_server_req_res_time_sum{method=\"GET\",route=\"/\",status_code=\"200\"} 0.25
http_express_server_req_res_time_count{method=\"GET\",route=\"/\",status_code=\"200\"} 1
";
    assert_eq!(body, expected);
}

#[test]
fn unlabeled_histogram_omits_braces_on_sum_and_count() {
    let registry = Registry::new();
    let h = Arc::new(HistogramVec::new("lat", "x", [], &[10.0]).unwrap());
    registry.register(h.clone()).unwrap();
    h.observe([], 20.0);

    let body = registry.metrics();
    assert!(body.contains("lat_bucket{le=\"10\"} 0\n"));
    assert!(body.contains("lat_bucket{le=\"+Inf\"} 1\n"));
    assert!(body.contains("lat_sum 20\n"));
    assert!(body.contains("lat_count 1\n"));
}

#[test]
fn concurrent_observations_are_not_lost() {
    let h = Arc::new(request_histogram());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                for i in 0..1000 {
                    h.observe(["GET", "/", "200"], (i % 3000) as f64);
                }
            })
        })
        .collect();
    for t in handles {
        t.join().unwrap();
    }

    let snap = h.snapshot(["GET", "/", "200"]).unwrap();
    assert_eq!(snap.count, 8000);
    let mut prev = 0;
    for (_, c) in &snap.buckets {
        assert!(*c >= prev);
        prev = *c;
    }
    assert!(prev <= snap.count);
}
