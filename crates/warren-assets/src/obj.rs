//! Minimal Wavefront OBJ subset parser for convex collision hulls.
//!
//! Supports exactly what the embedded collision assets use: `v` vertex
//! lines, `f` face lines (triangles or larger polygons, `i`, `i/j`,
//! `i//k`, and `i/j/k` index forms), comments, and blank lines. Normals,
//! texture coordinates, groups, and materials are skipped. Anything else
//! that cannot be parsed is an error: collision input is trusted nowhere.

use crate::error::AssetError;

/// A parsed hull source: the vertex cloud plus the number of faces seen.
///
/// Convex hull collision only consumes the vertex cloud; faces are parsed
/// to validate the source, and their count is kept for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct HullMesh {
    /// Vertex positions in mesh-local coordinates.
    pub vertices: Vec<[f32; 3]>,
    /// Number of face records in the source.
    pub face_count: usize,
}

/// Parse one OBJ-subset source into a [`HullMesh`].
///
/// `object` names the asset for error messages.
///
/// # Errors
///
/// Returns [`AssetError`] on any malformed line, non-finite vertex,
/// out-of-range face index, or a hull without volume (fewer than 4
/// vertices, coplanar vertices, or zero faces).
pub fn parse_hull(object: &str, source: &str) -> Result<HullMesh, AssetError> {
    let mut vertices: Vec<[f32; 3]> = Vec::new();
    let mut face_count = 0usize;

    for (idx, raw) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let directive = tokens.next().unwrap_or("");
        match directive {
            "v" => {
                let v = parse_vertex(object, line_no, &mut tokens)?;
                vertices.push(v);
            }
            "f" => {
                parse_face(object, line_no, &mut tokens, vertices.len())?;
                face_count += 1;
            }
            // Render-oriented directives carry nothing collision needs.
            "vn" | "vt" | "o" | "g" | "s" | "mtllib" | "usemtl" => {}
            other => {
                return Err(AssetError::MalformedLine {
                    object: object.to_string(),
                    line: line_no,
                    detail: format!("unknown directive '{other}'"),
                });
            }
        }
    }

    if face_count == 0 {
        return Err(AssetError::DegenerateHull {
            object: object.to_string(),
            reason: "no faces".to_string(),
        });
    }
    check_volume(object, &vertices)?;

    Ok(HullMesh {
        vertices,
        face_count,
    })
}

fn parse_vertex<'a>(
    object: &str,
    line: usize,
    tokens: &mut impl Iterator<Item = &'a str>,
) -> Result<[f32; 3], AssetError> {
    let mut coords = [0.0f32; 3];
    for slot in coords.iter_mut() {
        let tok = tokens.next().ok_or_else(|| AssetError::MalformedLine {
            object: object.to_string(),
            line,
            detail: "vertex needs 3 coordinates".to_string(),
        })?;
        let value: f32 = tok.parse().map_err(|_| AssetError::MalformedLine {
            object: object.to_string(),
            line,
            detail: format!("bad coordinate '{tok}'"),
        })?;
        if !value.is_finite() {
            return Err(AssetError::NonFiniteVertex {
                object: object.to_string(),
                line,
            });
        }
        *slot = value;
    }
    Ok(coords)
}

fn parse_face<'a>(
    object: &str,
    line: usize,
    tokens: &mut impl Iterator<Item = &'a str>,
    vertex_count: usize,
) -> Result<(), AssetError> {
    let mut corners = 0usize;
    for tok in tokens {
        // "i", "i/j", "i//k", "i/j/k" — only the position index matters.
        let first = tok.split('/').next().unwrap_or("");
        let index: i64 = first.parse().map_err(|_| AssetError::MalformedLine {
            object: object.to_string(),
            line,
            detail: format!("bad face index '{tok}'"),
        })?;
        if index < 1 || index as usize > vertex_count {
            return Err(AssetError::FaceIndexOutOfRange {
                object: object.to_string(),
                line,
                index,
                vertex_count,
            });
        }
        corners += 1;
    }
    if corners < 3 {
        return Err(AssetError::MalformedLine {
            object: object.to_string(),
            line,
            detail: format!("face has {corners} corners, need at least 3"),
        });
    }
    Ok(())
}

/// Reject vertex clouds that do not span a 3-D volume.
///
/// Picks a base vertex, then greedily finds a farthest second vertex, a
/// max-area third, and a max-volume fourth. If any step stays under
/// epsilon the cloud is a point/segment/plane and cannot form a hull.
fn check_volume(object: &str, vertices: &[[f32; 3]]) -> Result<(), AssetError> {
    const EPS: f32 = 1e-6;

    if vertices.len() < 4 {
        return Err(AssetError::DegenerateHull {
            object: object.to_string(),
            reason: format!("only {} vertices, need at least 4", vertices.len()),
        });
    }

    let v0 = vertices[0];
    let (mut best_len, mut v1) = (0.0f32, v0);
    for &v in &vertices[1..] {
        let d = sub(v, v0);
        let len = dot(d, d);
        if len > best_len {
            best_len = len;
            v1 = v;
        }
    }
    if best_len < EPS {
        return Err(AssetError::DegenerateHull {
            object: object.to_string(),
            reason: "all vertices coincident".to_string(),
        });
    }

    let edge = sub(v1, v0);
    let (mut best_area, mut v2) = (0.0f32, v0);
    for &v in vertices {
        let c = cross(edge, sub(v, v0));
        let area = dot(c, c);
        if area > best_area {
            best_area = area;
            v2 = v;
        }
    }
    if best_area < EPS {
        return Err(AssetError::DegenerateHull {
            object: object.to_string(),
            reason: "all vertices collinear".to_string(),
        });
    }

    let normal = cross(edge, sub(v2, v0));
    let mut best_volume = 0.0f32;
    for &v in vertices {
        let volume = dot(normal, sub(v, v0)).abs();
        if volume > best_volume {
            best_volume = volume;
        }
    }
    if best_volume < EPS {
        return Err(AssetError::DegenerateHull {
            object: object.to_string(),
            reason: "all vertices coplanar".to_string(),
        });
    }

    Ok(())
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}
