use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use bsl::{evaluate_and_print, tokenize};

const PROGRAM: &str = r#"
; Numbers and recursion
(define (fib n)
  (if (< n 2)
      n
      (+ (fib (- n 1))
         (fib (- n 2)))))

(define (factorial n)
  (cond [(= n 0) 1]
        [else (* n (factorial (- n 1)))]))

(check-expect (fib 10) 55)
(check-expect (factorial 5) 120)
(check-within (sqrt 2) 1.414 0.001)

; Structures
(define-struct ball (x y speed))
(define (move b)
  (make-ball (+ (ball-x b) (ball-speed b)) (ball-y b) (ball-speed b)))
(define (distance p)
  (sqrt (+ (* (posn-x p) (posn-x p)) (* (posn-y p) (posn-y p)))))

(check-expect (ball-x (move (make-ball 1 2 3))) 4)
(check-expect (distance (make-posn 3 4)) 5)
(check-error (ball-x (make-posn 1 2)))

; Strings and booleans
(define greeting (string-append "hello" ", " "world"))
(check-expect (string-length greeting) 12)
(and (string? greeting) (or #false (number? 1)))

; Mistakes the students make
(define x 1)
(define x 2)
(+ 1 "two")
(if #true 1)
undefined-name
(fib 15)
"#;

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");

    group.bench_with_input(BenchmarkId::new("tokenize", "program"), &PROGRAM, |b, input| {
        b.iter(|| tokenize(black_box(input)))
    });

    group.bench_with_input(
        BenchmarkId::new("evaluate_and_print", "program"),
        &PROGRAM,
        |b, input| b.iter(|| evaluate_and_print(black_box(input))),
    );

    group.finish();
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
