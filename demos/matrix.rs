use std::mem;

use nestalloc::{ChunkRef, Forest, HEADER_SIZE};
use tracing_subscriber::EnvFilter;

/// A matrix whose header, row-pointer array and rows all live in one ownership tree.
struct Matrix {
  rows: usize,
  cols: usize,
  chunk: ChunkRef,
  data: ChunkRef,
}

/// Builds a `rows x cols` matrix of `i32`.
///
/// The matrix chunk owns the row-pointer array, which owns every row.
fn matrix_new(
  forest: &mut Forest,
  rows: usize,
  cols: usize,
) -> Result<Matrix, nestalloc::AllocError> {
  let chunk = forest.zero_allocate(2 * mem::size_of::<usize>(), None)?;
  let dims = forest.as_ptr(chunk).expect("fresh chunk").cast::<usize>();
  unsafe {
    dims.write(rows);
    dims.add(1).write(cols);
  }

  let data = forest.zero_allocate(rows * mem::size_of::<*mut i32>(), Some(chunk))?;

  for row in 0..rows {
    let buffer = forest.allocate(cols * mem::size_of::<i32>(), Some(data))?;
    let row_ptr = forest.as_ptr(buffer).expect("fresh chunk").cast::<i32>();
    let table = forest.as_ptr(data).expect("fresh chunk").cast::<*mut i32>();

    unsafe {
      for col in 0..cols {
        row_ptr.add(col).write((row * cols + col) as i32);
      }
      table.add(row).write(row_ptr.as_ptr());
    }
  }

  Ok(Matrix { rows, cols, chunk, data })
}

fn matrix_get(
  forest: &Forest,
  matrix: &Matrix,
  row: usize,
  col: usize,
) -> i32 {
  let table = forest.as_ptr(matrix.data).expect("live matrix").cast::<*const i32>();

  unsafe { *table.add(row).read().add(col) }
}

fn matrix_delete(
  forest: &mut Forest,
  matrix: Matrix,
) {
  forest.release(Some(matrix.chunk));
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let mut forest = Forest::new();

  println!("[0] Header size per chunk = {HEADER_SIZE} bytes");

  // --------------------------------------------------------------------
  // 1) Build a 4x4 matrix: 1 header + 1 row table + 4 rows.
  // --------------------------------------------------------------------
  let matrix = matrix_new(&mut forest, 4, 4).expect("matrix allocation");
  println!(
    "\n[1] Built {}x{} matrix, live chunks = {}",
    matrix.rows,
    matrix.cols,
    forest.len()
  );

  for row in 0..matrix.rows {
    let values: Vec<i32> = (0..matrix.cols).map(|col| matrix_get(&forest, &matrix, row, col)).collect();
    println!("    row {row}: {values:?}");
  }

  // --------------------------------------------------------------------
  // 2) Every row depends on the row table, the row table on the matrix.
  // --------------------------------------------------------------------
  let rows: Vec<ChunkRef> = forest.children(matrix.data).collect();
  println!(
    "\n[2] Row table {:?} has {} children, its parent is {:?}",
    matrix.data,
    rows.len(),
    forest.get_parent(Some(matrix.data))
  );

  // --------------------------------------------------------------------
  // 3) Keep one row alive past the matrix by detaching it.
  // --------------------------------------------------------------------
  let kept = rows[0];
  forest.set_parent(Some(kept), None);
  println!("\n[3] Detached row {kept:?}, is root = {}", forest.is_root(kept));

  // --------------------------------------------------------------------
  // 4) One release frees the matrix, its row table and remaining rows.
  // --------------------------------------------------------------------
  matrix_delete(&mut forest, matrix);
  println!("\n[4] Released matrix, live chunks = {}", forest.len());

  forest.release(Some(kept));
  println!("\n[5] Released detached row, live chunks = {}", forest.len());
}
