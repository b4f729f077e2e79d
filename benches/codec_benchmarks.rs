// ABOUTME: Benchmarks for the two wire codecs on the gateway's hot path
// ABOUTME: SMPP frame check/parse/encode and SIP MESSAGE decode/encode

use bytes::{Bytes, BytesMut};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sipsmpp::datatypes::*;
use sipsmpp::sip::codec as sip_codec;
use sipsmpp::{Encodable, Frame};
use std::io::Cursor;
use std::time::Duration;

fn sample_body(text: &str) -> MessageBody {
    MessageBody::new("alice", "+15551234567", text.as_bytes())
        .dest_addr_ton(TypeOfNumber::International)
        .dest_addr_npi(NumericPlanIndicator::Isdn)
}

fn smpp_bytes(pdu: &impl Encodable) -> Vec<u8> {
    pdu.to_bytes().unwrap().to_vec()
}

fn sip_message_bytes(body: &str) -> Vec<u8> {
    format!(
        "MESSAGE sip:+15551234567@gw.example.com SIP/2.0\r\n\
         Via: SIP/2.0/UDP 10.0.0.1:5060;branch=z9hG4bK776asdhds\r\n\
         Max-Forwards: 70\r\n\
         From: \"Alice\" <sip:alice@example.com>;tag=49583\r\n\
         To: <sip:+15551234567@gw.example.com>\r\n\
         Call-ID: asd88asd77a@10.0.0.1\r\n\
         CSeq: 1 MESSAGE\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: {}\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

fn bench_frame_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_check");
    group.measurement_time(Duration::from_secs(10));

    let submit_bytes = smpp_bytes(&SubmitSm::new(1, sample_body("Hello World")));
    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(submit_bytes.as_slice()));
            Frame::check(&mut cursor)
        })
    });

    let enquire_bytes = smpp_bytes(&EnquireLink::new(1));
    group.bench_function("enquire_link", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(enquire_bytes.as_slice()));
            Frame::check(&mut cursor)
        })
    });

    group.finish();
}

fn bench_frame_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_parse");
    group.measurement_time(Duration::from_secs(10));

    let submit_bytes = smpp_bytes(&SubmitSm::new(1, sample_body("Hello World")));
    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(submit_bytes.as_slice()));
            Frame::parse(&mut cursor).unwrap()
        })
    });

    let deliver_bytes = smpp_bytes(&DeliverSm::new(1, sample_body("Hello World")));
    group.bench_function("deliver_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(deliver_bytes.as_slice()));
            Frame::parse(&mut cursor).unwrap()
        })
    });

    let bind_bytes = smpp_bytes(&BindTransceiver::new(1, "gateway", "secret"));
    group.bench_function("bind_transceiver", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(bind_bytes.as_slice()));
            Frame::parse(&mut cursor).unwrap()
        })
    });

    group.finish();
}

fn bench_frame_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");
    group.measurement_time(Duration::from_secs(10));

    let submit_sm = SubmitSm::new(1, sample_body("Hello World"));
    group.bench_function("submit_sm", |b| {
        b.iter(|| black_box(&submit_sm).to_bytes())
    });

    // Over 254 octets, so the text travels in message_payload
    let long = SubmitSm::new(1, sample_body("").with_payload(Bytes::from("A".repeat(400))));
    group.bench_function("submit_sm_message_payload", |b| {
        b.iter(|| black_box(&long).to_bytes())
    });

    let deliver_resp = DeliverSmResponse::new(1, CommandStatus::Ok);
    group.bench_function("deliver_sm_resp", |b| {
        b.iter(|| black_box(&deliver_resp).to_bytes())
    });

    group.finish();
}

fn bench_sip_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sip_decode");
    group.measurement_time(Duration::from_secs(10));

    for size in [10, 70, 160, 1000] {
        let wire = sip_message_bytes(&"A".repeat(size));
        group.bench_with_input(BenchmarkId::new("message", size), &wire, |b, wire| {
            b.iter(|| sip_codec::decode(black_box(wire.as_slice())).unwrap())
        });
    }

    group.finish();
}

fn bench_sip_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sip_encode");
    group.measurement_time(Duration::from_secs(10));

    let request = sip_codec::decode(&sip_message_bytes("Hello World")).unwrap();
    group.bench_function("message", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(512);
            sip_codec::encode(black_box(&request), &mut buf);
            buf
        })
    });

    let ok = request.response_to(200, "OK", "gw1");
    group.bench_function("response_200", |b| {
        b.iter(|| sip_codec::to_bytes(black_box(&ok)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_check,
    bench_frame_parse,
    bench_frame_encode,
    bench_sip_decode,
    bench_sip_encode
);
criterion_main!(benches);
