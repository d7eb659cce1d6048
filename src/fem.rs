use nalgebra::{DMatrix, DVector, Point2};

use crate::mesh::Mesh;


/// Assembles the weighted P1 stiffness matrix, sum over elements of
/// w_e * grad(phi_a) . grad(phi_b).
pub fn stiffness(mesh: &Mesh, weights: &[f64]) -> DMatrix<f64> {
    let mut k = DMatrix::<f64>::zeros(mesh.num_nodes, mesh.num_nodes);
    for (e, triangle) in mesh.triangles.iter().enumerate() {
        let p: Vec<&Point2<f64>> = triangle.iter().map(|&n| &mesh.nodes[n]).collect();
        let double_area = mesh.double_area(triangle);
        let area = double_area.abs() / 2.0;

        // Gradient coefficients of the linear shape functions.
        let b = [p[1].y - p[2].y, p[2].y - p[0].y, p[0].y - p[1].y];
        let c = [p[2].x - p[1].x, p[0].x - p[2].x, p[1].x - p[0].x];

        for a in 0..3 {
            for d in 0..3 {
                k[(triangle[a], triangle[d])] +=
                    weights[e] * (b[a] * b[d] + c[a] * c[d]) / (4.0 * area);
            }
        }
    }
    k
}

/// Assembles the weighted P1 mass matrix (exact for piecewise-constant
/// weights).
pub fn mass(mesh: &Mesh, weights: &[f64]) -> DMatrix<f64> {
    let mut m = DMatrix::<f64>::zeros(mesh.num_nodes, mesh.num_nodes);
    for (e, triangle) in mesh.triangles.iter().enumerate() {
        let area = mesh.double_area(triangle).abs() / 2.0;
        for a in 0..3 {
            for d in 0..3 {
                let entry = if a == d { 2.0 } else { 1.0 };
                m[(triangle[a], triangle[d])] += weights[e] * area * entry / 12.0;
            }
        }
    }
    m
}

/// Indices of the non-boundary nodes, in node order.
pub fn interior_nodes(boundary: &[bool]) -> Vec<usize> {
    boundary
        .iter()
        .enumerate()
        .filter(|(_, &flag)| !flag)
        .map(|(i, _)| i)
        .collect()
}

/// Restricts a full matrix to the interior degrees of freedom.
pub fn restrict(matrix: &DMatrix<f64>, interior: &[usize]) -> DMatrix<f64> {
    let n = interior.len();
    let mut reduced = DMatrix::<f64>::zeros(n, n);
    for (i, &gi) in interior.iter().enumerate() {
        for (j, &gj) in interior.iter().enumerate() {
            reduced[(i, j)] = matrix[(gi, gj)];
        }
    }
    reduced
}

/// Expands an interior vector back to the full node set with zeros on the
/// boundary.
pub fn expand(reduced: &DVector<f64>, interior: &[usize], num_nodes: usize) -> DVector<f64> {
    let mut full = DVector::<f64>::zeros(num_nodes);
    for (i, &gi) in interior.iter().enumerate() {
        full[gi] = reduced[i];
    }
    full
}

/// Integrates |field|^power over the mesh with vertex quadrature,
/// sum over elements of A_e / 3 * sum over vertices of f^power.
pub fn integrate_power(mesh: &Mesh, field: &DVector<f64>, power: u32) -> f64 {
    let mut total = 0.0;
    for triangle in &mesh.triangles {
        let area = mesh.double_area(triangle).abs() / 2.0;
        let vertex_sum: f64 = triangle
            .iter()
            .map(|&n| field[n].abs().powi(power as i32))
            .sum();
        total += area * vertex_sum / 3.0;
    }
    total
}
