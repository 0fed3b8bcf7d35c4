//! Per-event cost of the responder's interrupt handler

use bus_link::{BusEvent, SystemClock};
use bus_responder::Responder;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use record_codec::{encode, Record};
use ring_buffer::RingBuffer;

fn bench_full_frame(c: &mut Criterion) {
    let (tx, mut rx) = RingBuffer::split(16);
    let mut responder: Responder<_> = Responder::new(SystemClock::new(), tx);
    let bytes = encode(&Record::diagnostic(1, 0));

    c.bench_function("receive_and_finish_frame", |b| {
        b.iter(|| {
            for byte in bytes {
                responder.handle(BusEvent::ByteReceived(black_box(byte)));
            }
            responder.handle(BusEvent::FrameFinished);
            black_box(rx.pop())
        })
    });
}

fn bench_single_byte(c: &mut Criterion) {
    let (tx, _rx) = RingBuffer::split(16);
    let mut responder: Responder<_> = Responder::new(SystemClock::new(), tx);

    c.bench_function("receive_byte_overflowing", |b| {
        // Buffer fills on the first iterations; afterwards every byte takes the drop path
        b.iter(|| responder.handle(BusEvent::ByteReceived(black_box(0x5A))))
    });
}

criterion_group!(benches, bench_full_frame, bench_single_byte);
criterion_main!(benches);
