//! Synthetic A/B capture generator
//!
//! Writes feed_a.pcap and feed_b.pcap into a directory: the same sequence
//! stream on both feed ports, each side with its own random latency, loss
//! and optional VLAN tagging. Feed the directory straight to `feed-arbiter`.
//!
//! Usage: capture_generator [OUTPUT_DIR] [SEQUENCE_COUNT] [LOSS_PCT] [--vlan]

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use feed_arbiter::PcapWriter;
use rand::Rng;
use std::env;
use std::path::PathBuf;

const FEED_A_PORT: u16 = 14310;
const FEED_B_PORT: u16 = 15310;
const NANOS_PER_SEC: u64 = 1_000_000_000;

fn build_frame(port: u16, seq: u32, ts_ns: u64, vlan: bool) -> Vec<u8> {
    let shift = if vlan { 4 } else { 0 };
    let mut frame = vec![0u8; 66 + shift];

    frame[0..6].copy_from_slice(&[0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]);
    frame[6..12].copy_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
    if vlan {
        BigEndian::write_u16(&mut frame[12..14], 0x8100);
        BigEndian::write_u16(&mut frame[14..16], 100);
    }
    BigEndian::write_u16(&mut frame[12 + shift..14 + shift], 0x0800);

    let ip = 14 + shift;
    frame[ip] = 0x45;
    BigEndian::write_u16(&mut frame[ip + 2..ip + 4], 20 + 12);
    frame[ip + 8] = 32;
    frame[ip + 9] = 17;
    BigEndian::write_u32(&mut frame[ip + 12..ip + 16], 0x0a00_0001);
    BigEndian::write_u32(&mut frame[ip + 16..ip + 20], 0xe000_0001);

    let udp = ip + 20;
    BigEndian::write_u16(&mut frame[udp..udp + 2], 30001);
    BigEndian::write_u16(&mut frame[udp + 2..udp + 4], port);
    BigEndian::write_u16(&mut frame[udp + 4..udp + 6], 12);
    LittleEndian::write_u32(&mut frame[udp + 8..udp + 12], seq);

    let trailer = udp + 12;
    BigEndian::write_u32(&mut frame[trailer + 8..trailer + 12], (ts_ns / NANOS_PER_SEC) as u32);
    BigEndian::write_u32(&mut frame[trailer + 12..trailer + 16], (ts_ns % NANOS_PER_SEC) as u32);

    frame
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().skip(1).filter(|a| a != "--vlan").collect();
    let vlan = env::args().any(|a| a == "--vlan");

    let output_dir = PathBuf::from(args.first().map(String::as_str).unwrap_or("/tmp/feed_captures"));
    let sequence_count: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10000);
    let loss_pct: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1.0);

    std::fs::create_dir_all(&output_dir)?;
    let mut feed_a = PcapWriter::create(output_dir.join("feed_a.pcap"))?;
    let mut feed_b = PcapWriter::create(output_dir.join("feed_b.pcap"))?;

    let mut rng = rand::thread_rng();
    let loss = (loss_pct / 100.0).clamp(0.0, 1.0);
    let mut sent_ns = 1_700_000_000 * NANOS_PER_SEC;

    println!(
        "Generating {} sequences to {} (loss {}%, vlan {})",
        sequence_count,
        output_dir.display(),
        loss_pct,
        vlan
    );

    let mut written = [0u64; 2];
    for seq in 1..=sequence_count {
        sent_ns += rng.gen_range(500..5_000);

        for (i, (writer, port)) in [(&mut feed_a, FEED_A_PORT), (&mut feed_b, FEED_B_PORT)]
            .into_iter()
            .enumerate()
        {
            if rng.gen_bool(loss) {
                continue;
            }
            let arrival_ns = sent_ns + rng.gen_range(1_000..3_000);
            let frame = build_frame(port, seq, arrival_ns, vlan);
            writer.write_frame(
                (arrival_ns / NANOS_PER_SEC) as u32,
                ((arrival_ns % NANOS_PER_SEC) / 1_000) as u32,
                &frame,
            )?;
            written[i] += 1;
        }

        if seq % 10000 == 0 {
            println!("Generated {} sequences", seq);
        }
    }

    feed_a.into_inner()?;
    feed_b.into_inner()?;

    println!("Capture generation complete: A {} frames, B {} frames", written[0], written[1]);

    Ok(())
}
