//! Top-level engine that owns the transport, instruments and performers.

use std::collections::BTreeMap;

use ostinato_core::{
    EngineConfig, Error, Id, IdGenerator, Instrument, InstrumentData, InstrumentDefinition,
    InstrumentHandle, Performer, Result, Sequence, Transport,
};

type BeatCallback = Box<dyn FnMut(f64) + Send>;
type UpdateCallback = Box<dyn FnMut(f64, f64) + Send>;

/// The engine: one transport, a table of instruments, a table of
/// performers and the id source, driven by [`update`](Self::update)
/// from the host's control thread.
///
/// Audio rendering is pulled independently: the host fetches an
/// [`InstrumentHandle`] per instrument and calls its `process` from the
/// audio callback. All other operations belong to the control thread.
///
/// # Example
///
/// ```ignore
/// let mut engine = OstinatoEngine::builder().sample_rate(48000.0).build()?;
/// let instrument = engine.create_instrument(definition)?;
/// let performer = engine.add_performer(Sequence::new(), instrument)?;
/// engine.sequence_mut(performer)?.add_note(1, 0.0, note)?;
/// engine.start_playback();
/// engine.update(0.1);
/// ```
pub struct OstinatoEngine {
    config: EngineConfig,
    transport: Transport,
    instruments: BTreeMap<Id, Instrument>,
    performers: BTreeMap<Id, Performer>,
    id_generator: IdGenerator,
    tempo_bpm: f64,
    beat_callback: Option<BeatCallback>,
    update_callback: Option<UpdateCallback>,
}

impl OstinatoEngine {
    pub fn builder() -> crate::OstinatoEngineBuilder {
        crate::OstinatoEngineBuilder::default()
    }

    /// Creates an engine with the default configuration at the given
    /// sample rate.
    pub fn new(sample_rate: f64) -> Result<Self> {
        Self::builder().sample_rate(sample_rate).build()
    }

    pub(crate) fn from_config(config: EngineConfig, tempo_bpm: f64) -> Result<Self> {
        config.validate()?;
        if !tempo_bpm.is_finite() || tempo_bpm < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "tempo {tempo_bpm} BPM must be finite and non-negative"
            )));
        }
        Ok(Self {
            config,
            transport: Transport::new(),
            instruments: BTreeMap::new(),
            performers: BTreeMap::new(),
            id_generator: IdGenerator::new(),
            tempo_bpm,
            beat_callback: None,
            update_callback: None,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.config.sample_rate
    }

    // ---- instruments -------------------------------------------------

    /// Builds an instrument from its definition and returns its id.
    pub fn create_instrument(&mut self, definition: InstrumentDefinition) -> Result<Id> {
        let instrument =
            Instrument::new(definition, self.config.sample_rate, self.config.queue_capacity)?;
        let instrument_id = self.id_generator.next_id();
        self.instruments.insert(instrument_id, instrument);
        log::debug!("created instrument {instrument_id}");
        Ok(instrument_id)
    }

    /// Returns the audio-thread handle for an instrument. The handle
    /// stays valid across the instrument's destruction, at which point
    /// its `process` renders silence.
    pub fn instrument_handle(&self, instrument_id: Id) -> Result<InstrumentHandle> {
        self.instruments
            .get(&instrument_id)
            .map(Instrument::handle)
            .ok_or_else(|| not_found_instrument(instrument_id))
    }

    /// Destroys an instrument. Performers bound to it flush their
    /// carried notes to it first; afterwards their output is dropped
    /// until they are rebound. The host must not be inside the
    /// instrument's `process` call while this runs.
    pub fn destroy_instrument(&mut self, instrument_id: Id) -> Result<()> {
        if !self.instruments.contains_key(&instrument_id) {
            return Err(not_found_instrument(instrument_id));
        }
        for performer in self.performers.values_mut() {
            if performer.instrument_id() == instrument_id {
                performer.stop(&self.transport, &mut self.instruments);
            }
        }
        self.instruments.remove(&instrument_id);
        log::debug!("destroyed instrument {instrument_id}");
        Ok(())
    }

    // ---- performers --------------------------------------------------

    /// Binds a sequence to an instrument and returns the performer id.
    pub fn add_performer(&mut self, sequence: Sequence, instrument_id: Id) -> Result<Id> {
        if !self.instruments.contains_key(&instrument_id) {
            return Err(not_found_instrument(instrument_id));
        }
        let performer_id = self.id_generator.next_id();
        self.performers
            .insert(performer_id, Performer::new(sequence, instrument_id));
        log::debug!("added performer {performer_id} on instrument {instrument_id}");
        Ok(performer_id)
    }

    /// Removes a performer, releasing any notes it still holds at the
    /// current transport time.
    pub fn remove_performer(&mut self, performer_id: Id) -> Result<()> {
        let mut performer = self
            .performers
            .remove(&performer_id)
            .ok_or_else(|| not_found_performer(performer_id))?;
        performer.stop(&self.transport, &mut self.instruments);
        log::debug!("removed performer {performer_id}");
        Ok(())
    }

    /// Read access to a performer's sequence.
    pub fn sequence(&self, performer_id: Id) -> Result<&Sequence> {
        self.performers
            .get(&performer_id)
            .map(Performer::sequence)
            .ok_or_else(|| not_found_performer(performer_id))
    }

    /// Edit access to a performer's sequence.
    pub fn sequence_mut(&mut self, performer_id: Id) -> Result<&mut Sequence> {
        self.performers
            .get_mut(&performer_id)
            .map(Performer::sequence_mut)
            .ok_or_else(|| not_found_performer(performer_id))
    }

    pub fn performer_instrument(&self, performer_id: Id) -> Result<Id> {
        self.performers
            .get(&performer_id)
            .map(Performer::instrument_id)
            .ok_or_else(|| not_found_performer(performer_id))
    }

    /// Rebinds a performer to another instrument. Notes still sounding
    /// go silent on the old instrument immediately; nothing carries
    /// over to the new one.
    pub fn set_performer_instrument(&mut self, performer_id: Id, instrument_id: Id) -> Result<()> {
        if !self.instruments.contains_key(&instrument_id) {
            return Err(not_found_instrument(instrument_id));
        }
        let performer = self
            .performers
            .get_mut(&performer_id)
            .ok_or_else(|| not_found_performer(performer_id))?;
        performer.set_instrument(instrument_id, &self.transport, &mut self.instruments);
        Ok(())
    }

    // ---- transport ---------------------------------------------------

    /// Sets the playback tempo in BPM, clamped to `[0, inf)`.
    /// Non-finite input is ignored.
    pub fn set_tempo(&mut self, tempo_bpm: f64) {
        if tempo_bpm.is_finite() {
            self.tempo_bpm = tempo_bpm.max(0.0);
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo_bpm
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Current position in beats.
    pub fn position(&self) -> f64 {
        self.transport.position()
    }

    /// Jumps to a position in beats, clamped to `[0, inf)`.
    pub fn set_position(&mut self, position: f64) {
        self.transport.set_position(position);
    }

    /// Current wall time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.transport.timestamp()
    }

    /// Wall time of a beat position at the current tempo.
    pub fn timestamp_of(&self, position: f64) -> f64 {
        self.transport.timestamp_of(position)
    }

    pub fn start_playback(&mut self) {
        let Self {
            transport,
            beat_callback,
            ..
        } = self;
        transport.start(&mut |_, position| {
            if let Some(callback) = beat_callback.as_mut() {
                callback(position);
            }
        });
        log::debug!("playback started at beat {}", self.transport.position());
    }

    /// Stops playback: carried performer notes are forgotten and every
    /// instrument's sounding notes are stopped at the current time.
    pub fn stop_playback(&mut self) {
        for performer in self.performers.values_mut() {
            performer.clear_active_notes();
        }
        self.transport.stop();
        self.stop_all_instrument_notes();
        log::debug!("playback stopped at beat {}", self.transport.position());
    }

    /// Host callback fired for every integer beat the clock crosses.
    pub fn set_beat_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.beat_callback = Some(Box::new(callback));
    }

    /// Host callback fired once per traversed beat range, before the
    /// performers play it.
    pub fn set_update_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f64, f64) + Send + 'static,
    {
        self.update_callback = Some(Box::new(callback));
    }

    /// Advances musical time to the given wall-clock timestamp,
    /// scheduling every event in the traversed beat ranges into the
    /// bound instruments' queues.
    ///
    /// Hosts typically call this ahead of the audio clock by a fixed
    /// lookahead so the audio thread always has events to consume.
    pub fn update(&mut self, timestamp: f64) {
        self.transport.set_tempo(self.tempo_bpm / 60.0);
        let Self {
            transport,
            instruments,
            performers,
            beat_callback,
            update_callback,
            ..
        } = self;
        transport.update(
            timestamp,
            &mut |_, position| {
                if let Some(callback) = beat_callback.as_mut() {
                    callback(position);
                }
            },
            &mut |transport, begin_position, end_position| {
                if let Some(callback) = update_callback.as_mut() {
                    callback(begin_position, end_position);
                }
                for performer in performers.values_mut() {
                    performer.perform(begin_position, end_position, transport, instruments);
                }
            },
        );
    }

    // ---- per-instrument operations ----------------------------------

    /// Sets a parameter value, stamped with the current transport time.
    pub fn set_parameter(&mut self, instrument_id: Id, index: usize, value: f64) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?
            .set_parameter(index, value, timestamp)
    }

    pub fn reset_parameter(&mut self, instrument_id: Id, index: usize) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?
            .reset_parameter(index, timestamp)
    }

    pub fn reset_all_parameters(&mut self, instrument_id: Id) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?
            .reset_all_parameters(timestamp)
    }

    /// Current value of an instrument parameter.
    pub fn parameter(&self, instrument_id: Id, index: usize) -> Result<f64> {
        self.instruments
            .get(&instrument_id)
            .ok_or_else(|| not_found_instrument(instrument_id))?
            .parameter(index)
            .map(|parameter| parameter.value())
            .ok_or_else(|| Error::NotFound(format!("parameter {index}")))
    }

    /// Transfers an owned data payload to an instrument's DSP state.
    pub fn set_data(&mut self, instrument_id: Id, data: InstrumentData) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?.set_data(data, timestamp)
    }

    pub fn start_note(&mut self, instrument_id: Id, pitch: f64, intensity: f64) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?
            .start_note(pitch, intensity, timestamp)
    }

    pub fn stop_note(&mut self, instrument_id: Id, pitch: f64) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?.stop_note(pitch, timestamp)
    }

    pub fn stop_all_notes(&mut self, instrument_id: Id) -> Result<()> {
        let timestamp = self.transport.timestamp();
        self.instrument_mut(instrument_id)?.stop_all_notes(timestamp)
    }

    pub fn is_note_on(&self, instrument_id: Id, pitch: f64) -> Result<bool> {
        self.instruments
            .get(&instrument_id)
            .map(|instrument| instrument.is_note_on(pitch))
            .ok_or_else(|| not_found_instrument(instrument_id))
    }

    /// Observation hook invoked on the control thread for every note
    /// that starts on the instrument.
    pub fn set_note_on_callback<F>(&mut self, instrument_id: Id, callback: F) -> Result<()>
    where
        F: FnMut(f64, f64, f64) + Send + 'static,
    {
        self.instrument_mut(instrument_id)?
            .set_note_on_callback(callback);
        Ok(())
    }

    /// Observation hook invoked on the control thread for every note
    /// that stops on the instrument.
    pub fn set_note_off_callback<F>(&mut self, instrument_id: Id, callback: F) -> Result<()>
    where
        F: FnMut(f64, f64) + Send + 'static,
    {
        self.instrument_mut(instrument_id)?
            .set_note_off_callback(callback);
        Ok(())
    }

    // ---- engine-wide sweeps -----------------------------------------

    /// Stops every sounding note on every instrument at the current
    /// transport time.
    pub fn stop_all_instrument_notes(&mut self) {
        let timestamp = self.transport.timestamp();
        for (instrument_id, instrument) in self.instruments.iter_mut() {
            if let Err(error) = instrument.stop_all_notes(timestamp) {
                log::warn!("stop_all_notes on instrument {instrument_id}: {error}");
            }
        }
    }

    /// Resets every parameter of every instrument to its default.
    pub fn reset_all_instrument_parameters(&mut self) {
        let timestamp = self.transport.timestamp();
        for (instrument_id, instrument) in self.instruments.iter_mut() {
            if let Err(error) = instrument.reset_all_parameters(timestamp) {
                log::warn!("reset_all_parameters on instrument {instrument_id}: {error}");
            }
        }
    }

    fn instrument_mut(&mut self, instrument_id: Id) -> Result<&mut Instrument> {
        self.instruments
            .get_mut(&instrument_id)
            .ok_or_else(|| not_found_instrument(instrument_id))
    }
}

fn not_found_instrument(instrument_id: Id) -> Error {
    Error::NotFound(format!("instrument {instrument_id}"))
}

fn not_found_performer(performer_id: Id) -> Error {
    Error::NotFound(format!("performer {performer_id}"))
}
