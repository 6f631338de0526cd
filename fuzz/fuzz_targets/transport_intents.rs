#![no_main]

use libfuzzer_sys::fuzz_target;
use pieces::audio::NullBackend;
use pieces::model::{Library, Movement, Piece, TransportState};
use pieces::shell::{AfterCurrent, StatusBar};
use pieces::transport::Transport;

fuzz_target!(|data: &[u8]| {
    let Some((&shape, ops)) = data.split_first() else {
        return;
    };

    let library: Library = (0..(shape % 6) + 1)
        .map(|index| {
            let movements = (0..(shape as usize >> 4) % 4 + 1)
                .map(|movement| Movement::from_path(format!("piece_{index}/{movement}.flac")))
                .collect();
            Piece::new(format!("piece_{index}"), movements)
        })
        .collect();
    let total = library.len();

    let mut transport = Transport::new(Box::new(NullBackend::new()), StatusBar::new());
    if transport.load_new_set(library, shape & 1 == 1).is_err() {
        return;
    }

    for byte in ops {
        match byte % 11 {
            0 => transport.play_pause(),
            1 => {
                transport.advance();
            }
            2 => transport.previous(),
            3 => transport.select_movement(usize::from(byte / 11)),
            4 => transport.set_volume(*byte),
            5 => transport.toggle_mute(),
            6 => transport.seek(f32::from(*byte) / 255.0),
            7 => transport.set_looping(!transport.is_looping()),
            8 => {
                let shell = transport.shell_mut();
                let enabled = !shell.pause_after_current();
                shell.set_pause_after_current(enabled);
            }
            9 => transport.on_backend_end_of_media(),
            _ => {
                transport.tick();
            }
        }

        assert!(transport.queue().len() <= total);
        assert!(transport.volume() <= 100);
        let current = transport.current();
        match current.current_index() {
            Some(index) => assert!(index < current.movements.len()),
            None => assert_eq!(transport.state(), TransportState::Idle),
        }
    }
});
