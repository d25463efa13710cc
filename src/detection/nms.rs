//! Greedy non-maximum suppression

use super::Detection;

/// Intersection over union of two boxes
pub fn iou(a: &Detection, b: &Detection) -> f64 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = a.right().min(b.right());
    let y2 = a.bottom().min(b.bottom());

    if x1 >= x2 || y1 >= y2 {
        return 0.0;
    }
    let intersection = (x2 - x1) * (y2 - y1);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Keep the strongest boxes, dropping any box whose IoU with an already kept
/// one exceeds `overlap`. The result is ordered by decreasing response.
pub fn non_maximum_suppression(detections: &[Detection], overlap: f64) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.response.total_cmp(&a.response));

    let mut kept: Vec<Detection> = Vec::with_capacity(sorted.len());
    for candidate in sorted {
        if kept.iter().all(|k| iou(k, &candidate) <= overlap) {
            kept.push(candidate);
        }
    }
    kept
}
