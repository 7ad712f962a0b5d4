//! Session Tests
//!
//! Upload -> tweak -> preview -> download, driven through `EditorSession`.

use audio_studio::dsp::{EffectParams, Preset};
use audio_studio::engine::codec::encode_wav;
use audio_studio::engine::{
    generate_stereo_test_tone, generate_test_tone, EditorSession, PlaybackState, SampleBuffer,
    WavDecoder,
};
use audio_studio::export::{effects_suffix, ExportFormat};
use audio_studio::{StudioConfig, StudioError};
use pretty_assertions::assert_eq;

fn wav_upload() -> Vec<u8> {
    encode_wav(&generate_stereo_test_tone(440.0, 660.0, 1.0, 16000)).unwrap()
}

fn session_with_upload() -> EditorSession {
    let mut session = EditorSession::new(StudioConfig {
        impulse_seed: Some(99),
        ..StudioConfig::default()
    });
    session
        .upload("demo.wav", Some("audio/wav"), &wav_upload(), &WavDecoder)
        .unwrap();
    session
}

#[test]
fn test_nightcore_then_default_has_no_suffix() {
    let mut session = session_with_upload();

    session.apply_preset(Preset::Nightcore).unwrap();
    assert_eq!(
        session.export(None).unwrap().file_name,
        "demo_sped-pitched_modified.wav"
    );

    session.apply_params(EffectParams::default()).unwrap();
    assert_eq!(effects_suffix(session.params()), None);
    assert_eq!(session.export(None).unwrap().file_name, "demo_modified.wav");
    assert!(!session.is_modified());
}

#[test]
fn test_oversized_upload_rejected() {
    let mut session = EditorSession::new(StudioConfig {
        max_upload_bytes: 1024,
        ..StudioConfig::default()
    });

    let err = session
        .upload("demo.wav", Some("audio/wav"), &wav_upload(), &WavDecoder)
        .unwrap_err();

    assert!(matches!(err, StudioError::FileTooLarge { .. }));
    assert!(err.is_upload_error());
    assert!(session.original().is_none());
    assert_eq!(session.playback().state(), PlaybackState::Idle);
}

#[test]
fn test_unsupported_upload_message() {
    let mut session = EditorSession::default();
    let err = session
        .upload("slides.pdf", Some("application/pdf"), b"%PDF-1.7", &WavDecoder)
        .unwrap_err();

    assert_eq!(
        err.friendly_message(),
        "Unsupported file format. Please upload MP3, WAV, OGG, FLAC, M4A, or AAC"
    );
}

#[test]
fn test_playback_position_survives_rerender() {
    let mut session = session_with_upload();

    session.playback_mut().play();
    session.playback_mut().seek(0.5);

    session
        .apply_params(EffectParams {
            speed: 0.5,
            ..EffectParams::default()
        })
        .unwrap();

    let playback = session.playback();
    assert_eq!(playback.state(), PlaybackState::Playing);
    assert!((playback.duration_secs() - 2.0).abs() < 1e-9);
    assert!((playback.position_secs() - 1.0).abs() < 1e-9);
}

#[test]
fn test_paused_playback_stays_paused_after_rerender() {
    let mut session = session_with_upload();
    session.playback_mut().play();
    session.playback_mut().pause();

    session.apply_preset(Preset::SpedUp).unwrap();
    assert_eq!(session.playback().state(), PlaybackState::Paused);
    assert_eq!(session.playback().position_secs(), 0.0);
}

#[test]
fn test_render_failure_keeps_current_buffer() {
    // 1000 Hz decodes fine but is below the renderable range
    let upload = encode_wav(&generate_test_tone(220.0, 0.5, 1000)).unwrap();
    let mut session = EditorSession::default();
    session
        .upload("low-rate.wav", Some("audio/wav"), &upload, &WavDecoder)
        .unwrap();
    session.playback_mut().play();
    session.playback_mut().seek(0.5);

    let before = session.current().unwrap().clone();
    let position = session.playback().position_secs();

    let result = session.apply_params(EffectParams {
        speed: 2.0,
        ..EffectParams::default()
    });

    assert!(matches!(result, Err(StudioError::RenderFailure { .. })));
    assert_eq!(session.current(), Some(&before));
    assert_eq!(*session.params(), EffectParams::default());
    assert_eq!(session.playback().state(), PlaybackState::Playing);
    assert_eq!(session.playback().position_secs(), position);
    assert_eq!(session.export(None).unwrap().file_name, "low-rate_modified.wav");
}

#[test]
fn test_mp3_export_is_honest_wav() {
    let session = session_with_upload();
    let file = session.export(Some(ExportFormat::Mp3)).unwrap();

    assert!(file.substituted);
    assert_eq!(file.requested, ExportFormat::Mp3);
    assert_eq!(file.media_type, "audio/wav");
    assert!(file.file_name.ends_with(".wav"));
    assert_eq!(&file.bytes[8..12], b"WAVE");
}

#[test]
fn test_export_roundtrips_through_decoder() {
    let mut session = session_with_upload();
    session
        .apply_params(EffectParams {
            volume: 0.5,
            ..EffectParams::default()
        })
        .unwrap();

    let file = session.export(Some(ExportFormat::Wav)).unwrap();

    let mut next = EditorSession::default();
    let reloaded = next
        .upload(&file.file_name, Some(file.media_type), &file.bytes, &WavDecoder)
        .unwrap();

    let current: &SampleBuffer = session.current().unwrap();
    assert_eq!(reloaded.buffer.num_channels(), current.num_channels());
    assert_eq!(reloaded.buffer.frames(), current.frames());
    assert_eq!(reloaded.buffer.sample_rate, 16000);
}

#[test]
fn test_closed_session_rejects_work() {
    let mut session = session_with_upload();
    session.close();

    assert!(session.is_closed());
    assert!(matches!(
        session.apply_params(EffectParams::default()),
        Err(StudioError::NoAudioLoaded)
    ));
    assert!(matches!(
        session.upload("demo.wav", None, &wav_upload(), &WavDecoder),
        Err(StudioError::ContextClosed)
    ));
}
