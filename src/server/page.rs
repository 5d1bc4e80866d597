/// Operator dashboard served at `/`
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>CCD Capture</title>
    <style>
        body { font-family: sans-serif; margin: 1em; }
        fieldset { margin-bottom: 0.5em; }
        input[type=text] { width: 5em; }
        img { border: 1px solid #888; margin: 2px; }
        .error { color: #b00; }
        .warning { color: #b60; }
    </style>
</head>
<body>
    <h1>CCD Capture - <span id="cameraId"></span></h1>
    <p>Status <span id="status"></span>, image <span id="imageSequence"></span>
       taken <span id="curImageTime"></span> - <span id="msg"></span></p>

    <fieldset>
        <legend>Exposure</legend>
        <input type="text" id="exposure-input" value="0.5"> s
        <button onclick="post('setExposureTime', value('exposure-input'))">Set</button>
        <button onclick="post('startExposure')">Single</button>
        <button onclick="post('startContinuousExposures')">Continuous</button>
        <button onclick="post('stopContinuousExposures')">Stop</button>
    </fieldset>
    <fieldset>
        <legend>Geometry (x,y:w,h)</legend>
        Sub-frame <input type="text" id="subframe-input">
        <button onclick="post('setSubFrame', value('subframe-input'))">Set</button>
        <button onclick="post('clearSubFrame')">Clear</button>
        ROI <input type="text" id="roi-input">
        <button onclick="post('setRoi', value('roi-input'))">Set</button>
        <button onclick="post('clearRoi')">Clear</button>
    </fieldset>
    <fieldset>
        <legend>Cooler and saving</legend>
        <input type="text" id="cooler-setpoint" value="0"> C
        <button onclick="post('setCooler', value('cooler-setpoint'))">Cool</button>
        <button onclick="post('stopCooler')">Off</button>
        Name <input type="text" id="save-name" value="image">
        <button onclick="post('saveImage', value('save-name'))">Save</button>
        <button onclick="post('startAutoSave', value('save-name'))">Auto-save</button>
        <button onclick="post('stopAutoSave')">Stop auto-save</button>
    </fieldset>

    <div>
        <img id="roi-image" alt="frame">
        <img id="frame-histogram" alt="frame histogram" width="300">
        <img id="roi-histogram" alt="roi histogram" width="300">
        <img id="x-profile" alt="x profile" width="300">
        <img id="y-profile" alt="y profile" width="300">
    </div>
    <pre id="stats"></pre>

    <script>
        let lastImage = -1;

        function value(id) {
            return encodeURIComponent(document.getElementById(id).value);
        }

        function post(command, val) {
            fetch('/' + command + '/' + (val || ''), { method: 'POST' })
                .then(r => r.text())
                .then(text => { if (text !== 'ok') { alert(text); } });
        }

        function refreshImages(sequence) {
            const images = {
                'roi-image': 'getRoiImage',
                'frame-histogram': 'getFrameHistogram',
                'roi-histogram': 'getRoiHistogram',
                'x-profile': 'getRoiXProfile',
                'y-profile': 'getRoiYProfile',
            };
            for (const [id, command] of Object.entries(images)) {
                document.getElementById(id).src = '/' + command + '?n=' + sequence;
            }
        }

        function update(data) {
            for (const key of ['cameraId', 'status', 'imageSequence', 'msg']) {
                document.getElementById(key).textContent = data[key];
            }
            const msg = document.getElementById('msg');
            msg.className = data.errorState === -2 ? 'error' : data.errorState === -1 ? 'warning' : '';

            if (data.curImageTime > 0) {
                const age = Math.floor(Date.now() / 1000 - data.curImageTime);
                const time = new Date(data.curImageTime * 1000).toLocaleTimeString();
                document.getElementById('curImageTime').textContent = time + ' (' + age + ' s old)';
            }
            document.getElementById('stats').textContent =
                JSON.stringify({ frame: data.imageStats, roi: data.roiStats }, null, 2);

            if (data.imageSequence !== lastImage && data.imageSequence > 0) {
                lastImage = data.imageSequence;
                refreshImages(lastImage);
            }
        }

        function getData() {
            fetch('/getData').then(r => r.json()).then(update);
        }

        setInterval(getData, 1000);
        getData();
    </script>
</body>
</html>
"#;
